use super::{guild_id, is_admin, CommandResult, Context};
use crate::{constants::SUCCESS_COLOR, roles::sync_guild};
use poise::{command, serenity_prelude::CreateEmbed, CreateReply};

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("assign"),
    check = "is_admin",
    category = "Roles",
    required_bot_permissions = "MANAGE_ROLES",
    guild_only,
    ephemeral
)]
/// Manage level roles
pub async fn roles(_: Context<'_>) -> CommandResult {
    Ok(())
}

#[command(
    slash_command,
    check = "is_admin",
    required_bot_permissions = "MANAGE_ROLES",
    guild_only,
    ephemeral
)]
/// Give every member the role matching their level
pub async fn assign(ctx: Context<'_>) -> CommandResult {
    let guild = guild_id(ctx)?;
    ctx.defer_ephemeral().await?;
    let summary = sync_guild(ctx.serenity_context(), guild).await?;
    let mut embed = CreateEmbed::new()
        .title("Role sync complete")
        .color(SUCCESS_COLOR)
        .field("Members checked", summary.checked.to_string(), true)
        .field("Roles added", summary.added.to_string(), true)
        .field("Roles removed", summary.removed.to_string(), true);
    if summary.errors > 0 {
        embed = embed.field("Errors", summary.errors.to_string(), true);
    }
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
