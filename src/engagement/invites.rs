use super::{after_award, award_activity};
use crate::{
    commands::stats::get_stats,
    constants::INVITE_REFRESH_DELAY,
    database::{db, invite_object, Activity},
    retry_strategies::{discord_retry_strategy, should_retry},
};
use ahash::{HashMap, RandomState};
use anyhow::Result;
use backon::Retryable;
use chrono::Utc;
use dashmap::DashMap;
use poise::serenity_prelude::{Context, Error as SerenityError, GuildId, Http, Member, UserId};
use std::sync::OnceLock;
use tokio::time::{self, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteUse {
    pub uses: u64,
    pub inviter: Option<UserId>,
}

pub type InviteSnapshot = HashMap<String, InviteUse>;

static INVITES: OnceLock<DashMap<GuildId, InviteSnapshot, RandomState>> = OnceLock::new();

fn invites() -> &'static DashMap<GuildId, InviteSnapshot, RandomState> {
    INVITES.get_or_init(|| DashMap::with_hasher(RandomState::new()))
}

/// The inviter whose invite gained a use between the two snapshots.
pub fn find_inviter(before: &InviteSnapshot, after: &InviteSnapshot) -> Option<UserId> {
    after
        .iter()
        .find(|(code, now)| now.uses > before.get(*code).map_or(0, |then| then.uses))
        .and_then(|(_, now)| now.inviter)
}

async fn fetch_invites(http: &Http, guild: GuildId) -> Result<InviteSnapshot, SerenityError> {
    let invites = (|| guild.invites(http))
        .retry(discord_retry_strategy())
        .when(should_retry)
        .await?;
    Ok(invites
        .into_iter()
        .map(|invite| {
            (
                invite.code,
                InviteUse {
                    uses: invite.uses,
                    inviter: invite.inviter.map(|user| user.id),
                },
            )
        })
        .collect())
}

pub async fn refresh_guild(http: &Http, guild: GuildId) {
    match fetch_invites(http, guild).await {
        Ok(snapshot) => {
            invites().insert(guild, snapshot);
        }
        Err(err) => warn!("Failed to refresh invites for guild {}: {}", guild, err),
    }
}

pub fn forget_guild(guild: GuildId) {
    invites().remove(&guild);
}

pub async fn refresh_loop(ctx: Context) {
    loop {
        let start_time = Instant::now();
        for guild in ctx.cache.guilds() {
            refresh_guild(&ctx.http, guild).await;
        }
        get_stats().add_invite_cycle(start_time.elapsed());
        time::sleep_until(start_time + INVITE_REFRESH_DELAY).await;
    }
}

pub async fn on_member_join(ctx: &Context, member: &Member) -> Result<()> {
    if member.user.bot {
        return Ok(());
    }
    let guild = member.guild_id;
    let after = fetch_invites(&ctx.http, guild).await?;
    let before = invites().insert(guild, after.clone()).unwrap_or_default();
    if db().await.has_invited(member.user.id).await? {
        info!("{} rejoined guild {}, no invite points", member.user.id, guild);
        return Ok(());
    }
    let Some(inviter) = find_inviter(&before, &after) else {
        info!("Could not tell who invited {} to guild {}", member.user.id, guild);
        return Ok(());
    };
    if inviter == member.user.id {
        return Ok(());
    }
    let outcome = award_activity(
        inviter,
        Activity::Invite,
        Some(invite_object(member.user.id)),
        None,
        Utc::now(),
    )
    .await?;
    info!("{} joined guild {} through an invite from {}", member.user.id, guild, inviter);
    after_award(ctx, guild, inviter, &outcome).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, u64, u64)]) -> InviteSnapshot {
        entries
            .iter()
            .map(|(code, uses, inviter)| {
                (
                    (*code).to_owned(),
                    InviteUse {
                        uses: *uses,
                        inviter: Some(UserId::new(*inviter)),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn detects_the_invite_that_was_used() {
        let before = snapshot(&[("abc", 2, 1), ("def", 5, 2)]);
        let after = snapshot(&[("abc", 2, 1), ("def", 6, 2)]);
        assert_eq!(find_inviter(&before, &after), Some(UserId::new(2)));
    }

    #[test]
    fn new_invites_with_uses_count() {
        let before = snapshot(&[("abc", 2, 1)]);
        let after = snapshot(&[("abc", 2, 1), ("new", 1, 3)]);
        assert_eq!(find_inviter(&before, &after), Some(UserId::new(3)));
    }

    #[test]
    fn unchanged_invites_yield_nobody() {
        let before = snapshot(&[("abc", 2, 1)]);
        assert_eq!(find_inviter(&before, &before.clone()), None);
        assert_eq!(find_inviter(&before, &InviteSnapshot::default()), None);
    }
}
