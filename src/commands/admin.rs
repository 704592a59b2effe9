use super::{is_admin, CommandError, CommandResult, Context};
use crate::{
    database::db,
    message_utils::{render_lines_reply, success_message},
};
use poise::{
    command,
    serenity_prelude::{Mention, User},
};
use tracing::info;

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("list", "add", "remove"),
    check = "is_admin",
    category = "Admins",
    guild_only,
    ephemeral
)]
/// Manage bot admins
pub async fn admin(_: Context<'_>) -> CommandResult {
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// List bot admins
pub async fn list(ctx: Context<'_>) -> CommandResult {
    let lines = db()
        .await
        .admin_ids()
        .await?
        .into_iter()
        .map(|user| Mention::User(user).to_string())
        .collect::<Vec<_>>();
    ctx.send(render_lines_reply(lines, "🛡️ Bot admins")).await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Make a user a bot admin
pub async fn add(
    ctx: Context<'_>,
    #[description = "User to promote"] user: User,
) -> CommandResult {
    if user.bot {
        return Err(CommandError::Expected(String::from(
            "Bots can't be admins.",
        )));
    }
    if !db().await.add_admin(user.id).await? {
        return Err(CommandError::Expected(format!(
            "{} is already an admin.",
            user.name
        )));
    }
    info!("{} made {} an admin", ctx.author().id, user.id);
    ctx.send(success_message(format!("{} is now an admin.", user.name)))
        .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Remove a bot admin
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Admin to remove"] user: User,
) -> CommandResult {
    if user.id == ctx.author().id {
        return Err(CommandError::Expected(String::from(
            "You can't remove yourself.",
        )));
    }
    if !db().await.remove_admin(user.id).await? {
        return Err(CommandError::Expected(format!(
            "{} is not an admin.",
            user.name
        )));
    }
    info!("{} removed {} from the admins", ctx.author().id, user.id);
    ctx.send(success_message(format!(
        "{} is no longer an admin.",
        user.name
    )))
    .await?;
    Ok(())
}
