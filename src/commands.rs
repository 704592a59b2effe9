use crate::{
    config::ConfigKey,
    constants::MAX_POINTS_AMOUNT,
    database::db,
    engagement::milestones::check_milestones,
    message_utils::format_thousands,
    roles, voice_display,
};
use poise::serenity_prelude::{self, GuildId, UserId};
use thiserror::Error;
use tokio::task;
use tracing::warn;

pub mod admin;
pub mod campaign;
pub mod channel;
pub mod exclusion;
pub mod exportdb;
pub mod help;
pub mod milestone;
pub mod points;
pub mod public;
pub mod reward;
pub mod role;
pub mod settings;
pub mod stats;
pub mod voicedisplay;

pub type Context<'a> = poise::Context<'a, (), CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Expected(String),
    #[error(transparent)]
    Unexpected(anyhow::Error),
}

impl From<serenity_prelude::Error> for CommandError {
    fn from(value: serenity_prelude::Error) -> Self {
        Self::Unexpected(value.into())
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(value: anyhow::Error) -> Self {
        Self::Unexpected(value)
    }
}

type CommandResult = Result<(), CommandError>;

/// Passes only for active bot admins.
async fn is_admin(ctx: Context<'_>) -> Result<bool, CommandError> {
    Ok(db().await.is_admin(ctx.author().id).await?)
}

fn validate_amount(amount: i64) -> Result<i64, CommandError> {
    if (1..=MAX_POINTS_AMOUNT).contains(&amount) {
        Ok(amount)
    } else {
        Err(CommandError::Expected(format!(
            "The amount must be between 1 and {}.",
            format_thousands(MAX_POINTS_AMOUNT)
        )))
    }
}

async fn require_member(user: UserId) -> Result<(), CommandError> {
    if db().await.member_exists(user).await? {
        Ok(())
    } else {
        Err(CommandError::Expected(format!(
            "<@{user}> has no points record yet."
        )))
    }
}

fn guild_id(ctx: Context<'_>) -> Result<GuildId, CommandError> {
    ctx.guild_id().ok_or_else(|| {
        CommandError::Expected(String::from("You cannot run this command in DMs."))
    })
}

/// Follow-up after an admin changed a member's points.
async fn after_points_change(
    ctx: Context<'_>,
    guild: GuildId,
    user: UserId,
    check_new_milestones: bool,
) -> CommandResult {
    let db = db().await;
    let level = db.update_level(user).await?;
    if check_new_milestones {
        if let Some(member) = db.member(user).await? {
            check_milestones(ctx.serenity_context(), user, member.total_points).await?;
        }
    }
    if level.changed() && db.config_flag(ConfigKey::LevelRolesEnabled).await? {
        if let Err(err) = roles::sync_member(ctx.serenity_context(), guild, user).await {
            warn!("Failed to sync level roles for {}: {:?}", user, err);
        }
    }
    refresh_display(ctx, guild).await?;
    Ok(())
}

/// Refreshes the top members display in the background when it is enabled.
async fn refresh_display(ctx: Context<'_>, guild: GuildId) -> CommandResult {
    if !db()
        .await
        .config_flag(ConfigKey::VoiceChannelDisplayEnabled)
        .await?
    {
        return Ok(());
    }
    let serenity_ctx = ctx.serenity_context().clone();
    task::spawn(async move {
        if let Err(err) = voice_display::refresh_guild(&serenity_ctx, guild).await {
            warn!("Failed to refresh the top members display in {}: {:?}", guild, err);
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_bounded() {
        assert!(validate_amount(0).is_err());
        assert!(validate_amount(-5).is_err());
        assert_eq!(validate_amount(1).ok(), Some(1));
        assert_eq!(validate_amount(MAX_POINTS_AMOUNT).ok(), Some(MAX_POINTS_AMOUNT));
        assert!(validate_amount(MAX_POINTS_AMOUNT + 1).is_err());
    }
}
