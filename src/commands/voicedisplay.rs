use super::{guild_id, is_admin, CommandResult, Context};
use crate::{
    config::ConfigKey,
    database::db,
    message_utils::success_message,
    voice_display::refresh_guild,
};
use poise::command;

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("toggle", "update", "interval"),
    check = "is_admin",
    category = "Voice display",
    required_bot_permissions = "MANAGE_CHANNELS",
    guild_only,
    ephemeral
)]
/// Manage the top members voice channels
pub async fn voicedisplay(_: Context<'_>) -> CommandResult {
    Ok(())
}

#[command(
    slash_command,
    check = "is_admin",
    required_bot_permissions = "MANAGE_CHANNELS",
    guild_only,
    ephemeral
)]
/// Turn the top members display on or off
pub async fn toggle(ctx: Context<'_>) -> CommandResult {
    let db = db().await;
    let enabled = !db.config_flag(ConfigKey::VoiceChannelDisplayEnabled).await?;
    db.set_config(ConfigKey::VoiceChannelDisplayEnabled, enabled.to_string())
        .await?;
    if enabled {
        ctx.defer_ephemeral().await?;
        refresh_guild(ctx.serenity_context(), guild_id(ctx)?).await?;
    }
    ctx.send(success_message(if enabled {
        "Top members display enabled."
    } else {
        "Top members display disabled."
    }))
    .await?;
    Ok(())
}

#[command(
    slash_command,
    check = "is_admin",
    required_bot_permissions = "MANAGE_CHANNELS",
    guild_only,
    ephemeral
)]
/// Refresh the top members display now
pub async fn update(ctx: Context<'_>) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let renamed = refresh_guild(ctx.serenity_context(), guild_id(ctx)?).await?;
    ctx.send(success_message(format!(
        "Top members display refreshed, {renamed} channels renamed."
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Set how often the display refreshes
pub async fn interval(
    ctx: Context<'_>,
    #[description = "Seconds between refreshes, at least 60"] seconds: u64,
) -> CommandResult {
    let value = ConfigKey::VoiceChannelUpdateInterval.validate(&seconds.to_string())?;
    db().await
        .set_config(ConfigKey::VoiceChannelUpdateInterval, value)
        .await?;
    ctx.send(success_message(format!(
        "The display now refreshes every {seconds} seconds."
    )))
    .await?;
    Ok(())
}
