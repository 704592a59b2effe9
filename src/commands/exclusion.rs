use super::{is_admin, CommandError, CommandResult, Context};
use crate::{
    database::db,
    message_utils::{render_lines_reply, success_message},
};
use poise::{
    command,
    serenity_prelude::{Mention, User},
};

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("add", "remove", "list"),
    check = "is_admin",
    category = "Leaderboard",
    guild_only,
    ephemeral
)]
/// Hide members from the leaderboard
pub async fn exclusion(_: Context<'_>) -> CommandResult {
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Hide a member from the leaderboard
pub async fn add(
    ctx: Context<'_>,
    #[description = "Member to hide"] user: User,
) -> CommandResult {
    if !db().await.exclude_member(user.id).await? {
        return Err(CommandError::Expected(format!(
            "{} is already excluded.",
            user.name
        )));
    }
    ctx.send(success_message(format!(
        "{} no longer appears on the leaderboard.",
        user.name
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Show a member on the leaderboard again
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Member to show again"] user: User,
) -> CommandResult {
    if !db().await.include_member(user.id).await? {
        return Err(CommandError::Expected(format!(
            "{} is not excluded.",
            user.name
        )));
    }
    ctx.send(success_message(format!(
        "{} appears on the leaderboard again.",
        user.name
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// List excluded members
pub async fn list(ctx: Context<'_>) -> CommandResult {
    let lines = db()
        .await
        .excluded_members()
        .await?
        .into_iter()
        .map(|user| Mention::User(user).to_string())
        .collect::<Vec<_>>();
    ctx.send(render_lines_reply(lines, "🙈 Excluded members"))
        .await?;
    Ok(())
}
