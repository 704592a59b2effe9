use super::{CommandError, CommandResult, Context};
use crate::{
    config::ConfigKey,
    database::db,
    render::{
        dashboard_reply, leaderboard_reply, load_dashboard, load_leaderboard, no_points_embed,
        quick_stats_reply,
    },
};
use poise::{command, serenity_prelude::User, CreateReply};

async fn require_enabled(key: ConfigKey, what: &str) -> CommandResult {
    if db().await.config_flag(key).await? {
        Ok(())
    } else {
        Err(CommandError::Expected(format!(
            "The {what} is currently disabled."
        )))
    }
}

#[command(slash_command, category = "Community", guild_only)]
/// Show the top members
pub async fn leaderboard(ctx: Context<'_>) -> CommandResult {
    ctx.defer().await?;
    let board = load_leaderboard(ctx.serenity_context(), ctx.author().id).await?;
    ctx.send(leaderboard_reply(&board).await).await?;
    Ok(())
}

#[command(slash_command, category = "Community", guild_only, ephemeral)]
/// Your full engagement dashboard
pub async fn dashboard(
    ctx: Context<'_>,
    #[description = "Member to look at, yourself by default"] user: Option<User>,
) -> CommandResult {
    require_enabled(ConfigKey::DashboardEnabled, "dashboard").await?;
    ctx.defer_ephemeral().await?;
    let user = user.map_or_else(|| ctx.author().id, |user| user.id);
    let reply = match load_dashboard(ctx.serenity_context(), ctx.guild_id(), user).await? {
        Some(dashboard) => dashboard_reply(&dashboard).await,
        None => CreateReply::default().embed(no_points_embed(user)),
    };
    ctx.send(reply).await?;
    Ok(())
}

#[command(slash_command, category = "Community", guild_only, ephemeral)]
/// A quick look at your points
pub async fn mystats(ctx: Context<'_>) -> CommandResult {
    require_enabled(ConfigKey::MystatsEnabled, "stats card").await?;
    ctx.defer_ephemeral().await?;
    let user = ctx.author().id;
    let reply = match load_dashboard(ctx.serenity_context(), ctx.guild_id(), user).await? {
        Some(dashboard) => quick_stats_reply(&dashboard).await,
        None => CreateReply::default().embed(no_points_embed(user)),
    };
    ctx.send(reply).await?;
    Ok(())
}
