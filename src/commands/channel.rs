use super::{is_admin, CommandError, CommandResult, Context};
use crate::{
    database::db,
    message_utils::{render_lines_reply, success_message},
};
use poise::{
    command,
    serenity_prelude::{GuildChannel, Mention},
};

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("track", "untrack", "list"),
    check = "is_admin",
    category = "Channels",
    guild_only,
    ephemeral
)]
/// Choose which channels earn points
pub async fn channel(_: Context<'_>) -> CommandResult {
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Start awarding points in a channel
pub async fn track(
    ctx: Context<'_>,
    #[description = "Channel to track"] channel: GuildChannel,
) -> CommandResult {
    if !db().await.track_channel(channel.id).await? {
        return Err(CommandError::Expected(format!(
            "{} is already tracked.",
            Mention::Channel(channel.id)
        )));
    }
    ctx.send(success_message(format!(
        "Now tracking {}.",
        Mention::Channel(channel.id)
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Stop awarding points in a channel
pub async fn untrack(
    ctx: Context<'_>,
    #[description = "Channel to stop tracking"] channel: GuildChannel,
) -> CommandResult {
    if !db().await.untrack_channel(channel.id).await? {
        return Err(CommandError::Expected(format!(
            "{} is not tracked.",
            Mention::Channel(channel.id)
        )));
    }
    ctx.send(success_message(format!(
        "Stopped tracking {}.",
        Mention::Channel(channel.id)
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// List tracked channels
pub async fn list(ctx: Context<'_>) -> CommandResult {
    let lines = db()
        .await
        .tracked_channels()
        .await?
        .into_iter()
        .map(|channel| Mention::Channel(channel).to_string())
        .collect::<Vec<_>>();
    ctx.send(render_lines_reply(lines, "📡 Tracked channels"))
        .await?;
    Ok(())
}
