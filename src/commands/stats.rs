use std::{
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use ahash::RandomState;
use moka::future::Cache;
use poise::{command, serenity_prelude::futures::TryFutureExt, CreateReply};
use sea_orm::DbErr;
use simple_moving_average::{NoSumSMA, SMA};

use crate::{
    commands::{CommandResult, Context},
    database::db,
    message_utils::info_embed,
};

#[derive(Debug)]
pub struct Stats {
    member_count: Cache<(), u64, RandomState>,
    engagement_count: Cache<(), u64, RandomState>,
    secs_per_display_cycle: Mutex<NoSumSMA<Duration, u32, 10>>,
    secs_per_invite_cycle: Mutex<NoSumSMA<Duration, u32, 10>>,
}

fn count_cache() -> Cache<(), u64, RandomState> {
    Cache::builder()
        .max_capacity(1)
        .initial_capacity(1)
        .time_to_live(Duration::from_secs(60))
        .build_with_hasher(RandomState::new())
}

impl Stats {
    fn new() -> Self {
        Self {
            member_count: count_cache(),
            engagement_count: count_cache(),
            secs_per_display_cycle: Mutex::new(NoSumSMA::from_zero(Duration::ZERO)),
            secs_per_invite_cycle: Mutex::new(NoSumSMA::from_zero(Duration::ZERO)),
        }
    }
    async fn member_count(&self) -> Result<u64, Arc<DbErr>> {
        self.member_count
            .try_get_with((), async { db().await.member_count().await })
            .await
    }
    async fn engagement_count(&self) -> Result<u64, Arc<DbErr>> {
        self.engagement_count
            .try_get_with((), async { db().await.engagement_count().await })
            .await
    }
    pub fn secs_per_display_cycle(&self) -> Duration {
        self.secs_per_display_cycle
            .lock()
            .map_or(Duration::ZERO, |sma| sma.get_average())
    }
    pub fn secs_per_invite_cycle(&self) -> Duration {
        self.secs_per_invite_cycle
            .lock()
            .map_or(Duration::ZERO, |sma| sma.get_average())
    }
    pub fn add_display_cycle(&self, cycle: Duration) {
        if let Ok(mut sma) = self.secs_per_display_cycle.lock() {
            sma.add_sample(cycle);
        }
    }
    pub fn add_invite_cycle(&self, cycle: Duration) {
        if let Ok(mut sma) = self.secs_per_invite_cycle.lock() {
            sma.add_sample(cycle);
        }
    }
}
impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

static STATS: OnceLock<Stats> = OnceLock::new();

pub fn get_stats() -> &'static Stats {
    STATS.get_or_init(Stats::new)
}

/// Get global stats for the bot
#[command(slash_command, ephemeral)]
pub async fn stats(ctx: Context<'_>) -> CommandResult {
    ctx.send(CreateReply::default().embed(
        info_embed(
            format!(
                "Members with points: {}\nRecorded engagements: {}\nSeconds per display refresh: {:.2}\nSeconds per invite refresh: {:.2}",
                get_stats().member_count().map_ok_or_else(
                    |_| String::from("failed to get"),
                    |count| ToString::to_string(&count)).await,
                get_stats().engagement_count().map_ok_or_else(
                    |_| String::from("failed to get"),
                    |count| ToString::to_string(&count)).await,
                get_stats().secs_per_display_cycle().as_secs_f32(),
                get_stats().secs_per_invite_cycle().as_secs_f32()
            )
        )
        .title("Bot stats")
    ))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_times_are_averaged() {
        let stats = Stats::new();
        assert_eq!(stats.secs_per_display_cycle(), Duration::ZERO);
        stats.add_display_cycle(Duration::from_secs(2));
        stats.add_display_cycle(Duration::from_secs(4));
        assert_eq!(stats.secs_per_display_cycle(), Duration::from_secs(3));
        assert_eq!(stats.secs_per_invite_cycle(), Duration::ZERO);
    }
}
