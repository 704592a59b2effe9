use super::{is_admin, CommandResult, Context};
use crate::{
    config::ConfigKey,
    database::db,
    message_utils::{render_lines_reply, success_message},
};
use poise::{
    command,
    serenity_prelude::{GuildChannel, Mention},
};
use tracing::info;

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("set", "view", "botchannel"),
    check = "is_admin",
    category = "Configuration",
    guild_only,
    ephemeral
)]
/// View and change bot settings
pub async fn config(_: Context<'_>) -> CommandResult {
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Change a setting
pub async fn set(
    ctx: Context<'_>,
    #[description = "Setting to change"] key: ConfigKey,
    #[description = "New value"] value: String,
) -> CommandResult {
    let value = key.validate(&value)?;
    db().await.set_config(key, value.clone()).await?;
    info!("{} set {} to {}", ctx.author().id, key.key(), value);
    ctx.send(success_message(format!("`{}` set to `{value}`.", key.key())))
        .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Show every setting
pub async fn view(ctx: Context<'_>) -> CommandResult {
    let lines = db()
        .await
        .all_configs()
        .await?
        .into_iter()
        .map(|(key, value)| {
            format!(
                "`{}`: {}",
                key.key(),
                value.map_or_else(|| String::from("*not set*"), |value| format!("`{value}`"))
            )
        })
        .collect::<Vec<_>>();
    ctx.send(render_lines_reply(lines, "⚙️ Settings")).await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Set the channel that receives milestone notifications
pub async fn botchannel(
    ctx: Context<'_>,
    #[description = "Notification channel"] channel: GuildChannel,
) -> CommandResult {
    db().await
        .set_config(ConfigKey::NotificationChannelId, channel.id.get().to_string())
        .await?;
    ctx.send(success_message(format!(
        "Milestone notifications will be posted in {}.",
        Mention::Channel(channel.id)
    )))
    .await?;
    Ok(())
}
