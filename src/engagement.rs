use crate::{
    commands::CommandError,
    config::ConfigKey,
    database::{db, Activity, Award, AwardOutcome},
    roles,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use poise::{
    serenity_prelude::{ChannelId, Context, FullEvent, GuildId, UserId},
    FrameworkContext,
};
use tokio::task;
use tracing::{debug, info, warn};

pub mod events;
pub mod invites;
pub mod milestones;

pub async fn handle_event(
    ctx: &Context,
    event: &FullEvent,
    _framework: FrameworkContext<'_, (), CommandError>,
) -> Result<(), CommandError> {
    match event {
        FullEvent::Message { new_message } => events::on_message(ctx, new_message).await?,
        FullEvent::ReactionAdd { add_reaction } => events::on_reaction(ctx, add_reaction).await?,
        FullEvent::GuildMemberAddition { new_member } => {
            invites::on_member_join(ctx, new_member).await?;
        }
        FullEvent::GuildCreate { guild, .. } => {
            invites::refresh_guild(&ctx.http, guild.id).await;
            let (ctx, guild) = (ctx.clone(), guild.id);
            task::spawn(async move {
                if let Err(err) = roles::sync_on_startup(&ctx, guild).await {
                    warn!("Startup role sync failed for guild {}: {:?}", guild, err);
                }
            });
        }
        FullEvent::GuildDelete { incomplete, .. } if !incomplete.unavailable => {
            invites::forget_guild(incomplete.id);
            let removed = db().await.delete_voice_display(incomplete.id).await?;
            info!("Left guild {}, forgot {} display channels", incomplete.id, removed);
        }
        FullEvent::InviteCreate { data } => {
            if let Some(guild) = data.guild_id {
                invites::refresh_guild(&ctx.http, guild).await;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Awards an activity using the current point values, cap and campaign settings.
pub async fn award_activity(
    user: UserId,
    activity: Activity,
    object: Option<String>,
    channel: Option<ChannelId>,
    at: DateTime<Utc>,
) -> Result<AwardOutcome> {
    let db = db().await;
    let award = Award {
        member: user,
        activity,
        object,
        channel,
        base_points: db.config_i64(activity.points_key()).await?,
        daily_limit: Some(db.config_i64(ConfigKey::DailyPointsLimit).await?)
            .filter(|limit| *limit > 0),
        apply_campaigns: db.config_flag(ConfigKey::CampaignSystemEnabled).await?,
        at,
    };
    let outcome = db.award(&award).await?;
    match &outcome {
        AwardOutcome::Awarded { points, total, .. } => debug!(
            "Awarded {} points to {} for {} (total {})",
            points,
            user,
            activity.as_str(),
            total
        ),
        AwardOutcome::Duplicate => debug!("Ignored repeated {} by {}", activity.as_str(), user),
        AwardOutcome::DailyCapReached { earned_today, limit } => debug!(
            "{} hit the daily cap ({}/{}) on {}",
            user,
            earned_today,
            limit,
            activity.as_str()
        ),
    }
    Ok(outcome)
}

/// Milestone notifications and role sync for a successful award.
pub async fn after_award(
    ctx: &Context,
    guild: GuildId,
    user: UserId,
    outcome: &AwardOutcome,
) -> Result<()> {
    let AwardOutcome::Awarded { total, level, .. } = outcome else {
        return Ok(());
    };
    milestones::check_milestones(ctx, user, *total).await?;
    if level.changed() {
        info!("{} moved from level {} to {}", user, level.old, level.new);
        if db().await.config_flag(ConfigKey::LevelRolesEnabled).await? {
            if let Err(err) = roles::sync_member(ctx, guild, user).await {
                warn!("Failed to sync level roles for {}: {:?}", user, err);
            }
        }
    }
    Ok(())
}
