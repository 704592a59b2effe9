use crate::{
    commands::stats::get_stats,
    config::ConfigKey,
    constants::{
        CHANNEL_NAME_MAX_LENGTH, MIN_VOICE_UPDATE_INTERVAL, VOICE_CATEGORY_NAME,
        VOICE_DISPLAY_SLOTS,
    },
    database::db,
    message_utils::format_thousands,
    names::display_name,
    ratelimit::ratelimiter,
    retry_strategies::{discord_retry_strategy, is_unknown_channel, should_retry},
};
use anyhow::Result;
use backon::Retryable;
use poise::serenity_prelude::{
    ChannelId, ChannelType, Context, CreateChannel, EditChannel, GuildChannel, GuildId,
    PermissionOverwrite, PermissionOverwriteType, Permissions,
};
use std::{collections::HashMap, time::Duration};
use tokio::time::{self, Instant};
use tracing::{debug, warn};

const MEDALS: [&str; VOICE_DISPLAY_SLOTS] = ["🥇", "🥈", "🥉"];
const PLACES: [&str; VOICE_DISPLAY_SLOTS] = ["1st Place", "2nd Place", "3rd Place"];

/// Channel name for one podium slot, kept within Discord's length limit.
pub fn slot_name(position: usize, entry: Option<(&str, i64)>) -> String {
    let medal = MEDALS[position];
    let Some((name, points)) = entry else {
        return format!("{medal} {}", PLACES[position]);
    };
    let grouped = format!("{medal} {name} ({} XP)", format_thousands(points));
    if grouped.chars().count() <= CHANNEL_NAME_MAX_LENGTH {
        return grouped;
    }
    let plain = format!("{medal} {name} ({points} XP)");
    if plain.chars().count() <= CHANNEL_NAME_MAX_LENGTH {
        return plain;
    }
    let budget = CHANNEL_NAME_MAX_LENGTH
        .saturating_sub(format!("{medal} ... ({points} XP)").chars().count());
    let truncated = name.chars().take(budget).collect::<String>();
    format!("{medal} {truncated}... ({points} XP)")
}

pub fn display_names(entries: &[(String, i64)]) -> Vec<String> {
    (0..VOICE_DISPLAY_SLOTS)
        .map(|position| {
            slot_name(
                position,
                entries
                    .get(position)
                    .map(|(name, points)| (name.as_str(), *points)),
            )
        })
        .collect()
}

fn locked_voice_channel(guild: GuildId, name: &str, category: ChannelId) -> CreateChannel<'_> {
    CreateChannel::new(name)
        .kind(ChannelType::Voice)
        .category(category)
        .permissions(vec![PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL,
            deny: Permissions::CONNECT,
            kind: PermissionOverwriteType::Role(guild.everyone_role()),
        }])
}

/// Makes sure the category and every slot channel exist; returns `(channel, current name)` per slot.
async fn ensure_channels(ctx: &Context, guild: GuildId) -> Result<Vec<(ChannelId, String)>> {
    let db = db().await;
    let existing: HashMap<ChannelId, GuildChannel> = guild.channels(&ctx.http).await?;
    let category = match existing
        .values()
        .find(|channel| channel.kind == ChannelType::Category && channel.name == VOICE_CATEGORY_NAME)
    {
        Some(category) => category.id,
        None => {
            ratelimiter().channels.acquire_one().await;
            guild
                .create_channel(
                    ctx,
                    CreateChannel::new(VOICE_CATEGORY_NAME)
                        .kind(ChannelType::Category)
                        .position(0),
                )
                .await?
                .id
        }
    };
    let stored = db.voice_display(guild).await?;
    let mut res = Vec::with_capacity(VOICE_DISPLAY_SLOTS);
    for position in 0..VOICE_DISPLAY_SLOTS {
        let known = stored
            .iter()
            .find(|(stored_position, _)| usize::try_from(*stored_position).ok() == Some(position))
            .and_then(|(_, channel)| existing.get(channel));
        if let Some(channel) = known {
            res.push((channel.id, channel.name.clone()));
            continue;
        }
        let name = slot_name(position, None);
        ratelimiter().channels.acquire_one().await;
        let channel = guild
            .create_channel(ctx, locked_voice_channel(guild, &name, category))
            .await?;
        db.save_voice_display(guild, i32::try_from(position)?, channel.id)
            .await?;
        debug!("Created display channel {} in {}", channel.id, guild);
        res.push((channel.id, name));
    }
    Ok(res)
}

/// Renames the podium channels of a guild to the current top three. Returns how many changed.
pub async fn refresh_guild(ctx: &Context, guild: GuildId) -> Result<usize> {
    let mut entries = Vec::new();
    for (user, points) in db().await.leaderboard(VOICE_DISPLAY_SLOTS as u64).await? {
        entries.push((display_name(ctx, user).await, points));
    }
    let names = display_names(&entries);
    let channels = ensure_channels(ctx, guild).await?;
    let mut renamed = 0;
    for ((channel, current), name) in channels.into_iter().zip(names) {
        if current == name {
            continue;
        }
        ratelimiter().channels.acquire_one().await;
        match (|| channel.edit(ctx, EditChannel::new().name(&name)))
            .retry(discord_retry_strategy())
            .when(should_retry)
            .await
        {
            Ok(_) => renamed += 1,
            Err(err) if is_unknown_channel(&err) => {
                warn!("Display channel {} vanished, it will be recreated", channel);
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(renamed)
}

async fn update_interval() -> Duration {
    let secs = match db().await.config_i64(ConfigKey::VoiceChannelUpdateInterval).await {
        Ok(secs) => u64::try_from(secs).unwrap_or(MIN_VOICE_UPDATE_INTERVAL),
        Err(err) => {
            warn!("Failed to read the display interval: {}", err);
            MIN_VOICE_UPDATE_INTERVAL
        }
    };
    Duration::from_secs(secs.max(MIN_VOICE_UPDATE_INTERVAL))
}

pub async fn update_loop(ctx: Context) {
    loop {
        let start_time = Instant::now();
        let enabled = db()
            .await
            .config_flag(ConfigKey::VoiceChannelDisplayEnabled)
            .await
            .unwrap_or(false);
        if enabled {
            for guild in ctx.cache.guilds() {
                if let Err(err) = refresh_guild(&ctx, guild).await {
                    warn!("Failed to refresh the top members display in {}: {:?}", guild, err);
                }
            }
            get_stats().add_display_cycle(start_time.elapsed());
        }
        time::sleep_until(start_time + update_interval().await).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slots_show_placeholders() {
        assert_eq!(
            display_names(&[(String::from("alice"), 12345)]),
            vec!["🥇 alice (12,345 XP)", "🥈 2nd Place", "🥉 3rd Place"]
        );
    }

    #[test]
    fn long_names_drop_separators_first() {
        let name = "n".repeat(85);
        let shown = slot_name(1, Some((&name, 1_234_567)));
        assert_eq!(shown, format!("🥈 {name} (1234567 XP)"));
        assert_eq!(shown.chars().count(), CHANNEL_NAME_MAX_LENGTH);
        let grouped = slot_name(1, Some((&name[..83], 1_234_567)));
        assert!(grouped.ends_with(" (1,234,567 XP)"));
    }

    #[test]
    fn very_long_names_are_truncated() {
        let name = "x".repeat(150);
        let shown = slot_name(2, Some((&name, 500)));
        assert_eq!(shown.chars().count(), CHANNEL_NAME_MAX_LENGTH);
        assert!(shown.starts_with("🥉 xxx"));
        assert!(shown.ends_with("... (500 XP)"));
    }
}
