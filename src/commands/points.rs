use super::{
    after_points_change, guild_id, is_admin, refresh_display, require_member, validate_amount,
    CommandError, CommandResult, Context,
};
use crate::{
    config::ConfigKey, database::db, message_utils::{format_thousands, success_message}, roles,
};
use chrono::Utc;
use poise::{command, serenity_prelude::User};
use tracing::{info, warn};

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("set", "add", "remove", "reset", "resetall", "dailylimit"),
    check = "is_admin",
    category = "Points",
    guild_only,
    ephemeral
)]
/// Manage member points
pub async fn points(_: Context<'_>) -> CommandResult {
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Set a member's total points
pub async fn set(
    ctx: Context<'_>,
    #[description = "The member to update"] user: User,
    #[description = "New total"] amount: i64,
) -> CommandResult {
    let amount = validate_amount(amount)?;
    require_member(user.id).await?;
    let guild = guild_id(ctx)?;
    db().await
        .set_points(user.id, amount, Utc::now().date_naive())
        .await?;
    info!("{} set the points of {} to {}", ctx.author().id, user.id, amount);
    after_points_change(ctx, guild, user.id, true).await?;
    ctx.send(success_message(format!(
        "Set {}'s points to {}.",
        user.name,
        format_thousands(amount)
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Give points to a member
pub async fn add(
    ctx: Context<'_>,
    #[description = "The member to reward"] user: User,
    #[description = "Points to add"] amount: i64,
) -> CommandResult {
    let amount = validate_amount(amount)?;
    require_member(user.id).await?;
    let guild = guild_id(ctx)?;
    let total = db()
        .await
        .add_points(user.id, amount, Utc::now().date_naive())
        .await?;
    info!("{} added {} points to {}", ctx.author().id, amount, user.id);
    after_points_change(ctx, guild, user.id, true).await?;
    ctx.send(success_message(format!(
        "Added {} points to {}. New total: {}.",
        format_thousands(amount),
        user.name,
        format_thousands(total)
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Take points away from a member
pub async fn remove(
    ctx: Context<'_>,
    #[description = "The member to update"] user: User,
    #[description = "Points to remove"] amount: i64,
) -> CommandResult {
    let amount = validate_amount(amount)?;
    require_member(user.id).await?;
    let guild = guild_id(ctx)?;
    let Some(total) = db().await.adjust_points(user.id, -amount).await? else {
        return Err(CommandError::Expected(format!(
            "{} has no points record yet.",
            user.name
        )));
    };
    info!("{} removed {} points from {}", ctx.author().id, amount, user.id);
    after_points_change(ctx, guild, user.id, false).await?;
    ctx.send(success_message(format!(
        "Removed {} points from {}. New total: {}.",
        format_thousands(amount),
        user.name,
        format_thousands(total)
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Reset a member's points and milestones
pub async fn reset(
    ctx: Context<'_>,
    #[description = "The member to reset"] user: User,
) -> CommandResult {
    let guild = guild_id(ctx)?;
    if !db().await.reset_points(user.id).await? {
        return Err(CommandError::Expected(format!(
            "{} has no points record yet.",
            user.name
        )));
    }
    info!("{} reset the points of {}", ctx.author().id, user.id);
    after_points_change(ctx, guild, user.id, false).await?;
    ctx.send(success_message(format!("Reset {}'s points.", user.name)))
        .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Reset every member's points and milestones
pub async fn resetall(
    ctx: Context<'_>,
    #[description = "Type CONFIRM to reset everyone"] confirmation: String,
) -> CommandResult {
    if confirmation != "CONFIRM" {
        return Err(CommandError::Expected(String::from(
            "Type `CONFIRM` to reset every member's points.",
        )));
    }
    let guild = guild_id(ctx)?;
    ctx.defer_ephemeral().await?;
    let db = db().await;
    let count = db.reset_all_points().await?;
    warn!("{} reset the points of all {} members", ctx.author().id, count);
    if db.config_flag(ConfigKey::LevelRolesEnabled).await? {
        if let Err(err) = roles::sync_guild(ctx.serenity_context(), guild).await {
            warn!("Failed to sync level roles after a full reset: {:?}", err);
        }
    }
    refresh_display(ctx, guild).await?;
    ctx.send(success_message(format!(
        "Reset the points of {count} members."
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Set the daily points limit (0 disables it)
pub async fn dailylimit(
    ctx: Context<'_>,
    #[description = "Maximum points per member per day"]
    #[min = 0]
    limit: i64,
) -> CommandResult {
    let value = ConfigKey::DailyPointsLimit.validate(&limit.to_string())?;
    db().await
        .set_config(ConfigKey::DailyPointsLimit, value)
        .await?;
    ctx.send(success_message(format!(
        "Daily points limit set to {}.",
        format_thousands(limit)
    )))
    .await?;
    Ok(())
}
