use crate::{
    commands::CommandError,
    constants::{DEFAULT_DATABASE_URL, MAX_POINTS_AMOUNT, MIN_VOICE_UPDATE_INTERVAL},
};
use anyhow::{Context, Result};
use poise::serenity_prelude::{ChannelId, UserId};
use std::{env, path::{Path, PathBuf}, sync::OnceLock};
use thiserror::Error;

/// Process-level settings read once from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: String,
    pub database_url: String,
    pub admin_ids: Vec<UserId>,
    /// Extra fonts for the image cards, on top of the system ones.
    pub font_dir: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TOKEN")
            .or_else(|_| env::var("DISCORD_TOKEN"))
            .context("failed to get bot token")?;
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| String::from(DEFAULT_DATABASE_URL));
        let admin_ids = env::var("ADMIN_IDS")
            .map(|ids| parse_user_ids(&ids))
            .unwrap_or_default();
        let font_dir = env::var_os("FONT_DIR").map(PathBuf::from);
        Ok(Self {
            token,
            database_url,
            admin_ids,
            font_dir,
        })
    }
}

fn parse_user_ids(list: &str) -> Vec<UserId> {
    list.split(',')
        .map(str::trim)
        .filter_map(|id| id.parse::<u64>().ok())
        .filter(|id| *id != 0)
        .map(UserId::new)
        .collect()
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

pub fn init_settings(settings: Settings) -> &'static Settings {
    SETTINGS.get_or_init(|| settings)
}

pub fn database_url() -> &'static str {
    SETTINGS
        .get()
        .map_or(DEFAULT_DATABASE_URL, |settings| &settings.database_url)
}

pub fn font_dir() -> Option<&'static Path> {
    SETTINGS.get()?.font_dir.as_deref()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`{0}` must be a whole number from 0 to {MAX_POINTS_AMOUNT}.")]
    NotACount(String),
    #[error("`{0}` must be `true` or `false`.")]
    NotAFlag(String),
    #[error("`{0}` is not a valid channel id.")]
    NotAChannel(String),
    #[error("The update interval must be at least {MIN_VOICE_UPDATE_INTERVAL} seconds.")]
    IntervalTooShort,
}

impl From<ConfigError> for CommandError {
    fn from(value: ConfigError) -> Self {
        Self::Expected(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Count,
    Flag,
    Channel,
    Interval,
}

/// Runtime settings stored in the `config` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, poise::ChoiceParameter)]
pub enum ConfigKey {
    #[name = "points_per_message"]
    PointsPerMessage,
    #[name = "points_per_reaction"]
    PointsPerReaction,
    #[name = "points_per_image"]
    PointsPerImage,
    #[name = "points_per_share"]
    PointsPerShare,
    #[name = "points_per_invite"]
    PointsPerInvite,
    #[name = "daily_points_limit"]
    DailyPointsLimit,
    #[name = "notification_channel_id"]
    NotificationChannelId,
    #[name = "voice_channel_display_enabled"]
    VoiceChannelDisplayEnabled,
    #[name = "voice_channel_update_interval"]
    VoiceChannelUpdateInterval,
    #[name = "level_roles_enabled"]
    LevelRolesEnabled,
    #[name = "campaign_system_enabled"]
    CampaignSystemEnabled,
    #[name = "dashboard_enabled"]
    DashboardEnabled,
    #[name = "mystats_enabled"]
    MystatsEnabled,
    #[name = "auto_assign_roles_on_startup"]
    AutoAssignRolesOnStartup,
}

impl ConfigKey {
    pub const ALL: [Self; 14] = [
        Self::PointsPerMessage,
        Self::PointsPerReaction,
        Self::PointsPerImage,
        Self::PointsPerShare,
        Self::PointsPerInvite,
        Self::DailyPointsLimit,
        Self::NotificationChannelId,
        Self::VoiceChannelDisplayEnabled,
        Self::VoiceChannelUpdateInterval,
        Self::LevelRolesEnabled,
        Self::CampaignSystemEnabled,
        Self::DashboardEnabled,
        Self::MystatsEnabled,
        Self::AutoAssignRolesOnStartup,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::PointsPerMessage => "points_per_message",
            Self::PointsPerReaction => "points_per_reaction",
            Self::PointsPerImage => "points_per_image",
            Self::PointsPerShare => "points_per_share",
            Self::PointsPerInvite => "points_per_invite",
            Self::DailyPointsLimit => "daily_points_limit",
            Self::NotificationChannelId => "notification_channel_id",
            Self::VoiceChannelDisplayEnabled => "voice_channel_display_enabled",
            Self::VoiceChannelUpdateInterval => "voice_channel_update_interval",
            Self::LevelRolesEnabled => "level_roles_enabled",
            Self::CampaignSystemEnabled => "campaign_system_enabled",
            Self::DashboardEnabled => "dashboard_enabled",
            Self::MystatsEnabled => "mystats_enabled",
            Self::AutoAssignRolesOnStartup => "auto_assign_roles_on_startup",
        }
    }

    pub const fn default_value(self) -> Option<&'static str> {
        match self {
            Self::PointsPerMessage | Self::PointsPerReaction => Some("5"),
            Self::PointsPerImage => Some("10"),
            Self::PointsPerShare => Some("50"),
            Self::PointsPerInvite => Some("1000"),
            Self::DailyPointsLimit => Some("100"),
            Self::NotificationChannelId => None,
            Self::VoiceChannelUpdateInterval => Some("60"),
            Self::VoiceChannelDisplayEnabled
            | Self::LevelRolesEnabled
            | Self::CampaignSystemEnabled
            | Self::DashboardEnabled
            | Self::MystatsEnabled
            | Self::AutoAssignRolesOnStartup => Some("true"),
        }
    }

    const fn kind(self) -> ValueKind {
        match self {
            Self::PointsPerMessage
            | Self::PointsPerReaction
            | Self::PointsPerImage
            | Self::PointsPerShare
            | Self::PointsPerInvite
            | Self::DailyPointsLimit => ValueKind::Count,
            Self::NotificationChannelId => ValueKind::Channel,
            Self::VoiceChannelUpdateInterval => ValueKind::Interval,
            Self::VoiceChannelDisplayEnabled
            | Self::LevelRolesEnabled
            | Self::CampaignSystemEnabled
            | Self::DashboardEnabled
            | Self::MystatsEnabled
            | Self::AutoAssignRolesOnStartup => ValueKind::Flag,
        }
    }

    /// Checks a candidate value and returns the form it is stored in.
    pub fn validate(self, value: &str) -> Result<String, ConfigError> {
        let value = value.trim();
        match self.kind() {
            ValueKind::Count => value
                .parse::<i64>()
                .ok()
                .filter(|count| (0..=MAX_POINTS_AMOUNT).contains(count))
                .map(|count| count.to_string())
                .ok_or_else(|| ConfigError::NotACount(value.to_owned())),
            ValueKind::Flag => parse_flag(value)
                .map(|flag| flag.to_string())
                .ok_or_else(|| ConfigError::NotAFlag(value.to_owned())),
            ValueKind::Channel => parse_channel(value)
                .map(|channel| channel.get().to_string())
                .ok_or_else(|| ConfigError::NotAChannel(value.to_owned())),
            ValueKind::Interval => match value.parse::<i64>() {
                Ok(secs)
                    if u64::try_from(secs).is_ok_and(|secs| secs >= MIN_VOICE_UPDATE_INTERVAL) =>
                {
                    Ok(secs.to_string())
                }
                Ok(_) => Err(ConfigError::IntervalTooShort),
                Err(_) => Err(ConfigError::NotACount(value.to_owned())),
            },
        }
    }

    /// Whether a stored value is usable; invalid ones fall back to the default.
    pub fn is_valid(self, value: &str) -> bool {
        self.validate(value).is_ok()
    }
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Some(true),
        "false" | "0" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Accepts a raw id or a `<#id>` channel mention.
pub fn parse_channel(value: &str) -> Option<ChannelId> {
    let value = value.trim();
    let raw = value
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(value);
    raw.parse::<u64>().ok().filter(|id| *id != 0).map(ChannelId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_keys_match_choice_names() {
        for key in ConfigKey::ALL {
            assert_eq!(poise::ChoiceParameter::name(&key), key.key());
        }
        assert!(ConfigKey::ALL
            .iter()
            .all(|key| key.key() != "streak_bonus_enabled"));
    }

    #[test]
    fn defaults_are_valid() {
        for key in ConfigKey::ALL {
            if let Some(default) = key.default_value() {
                assert!(key.is_valid(default), "{} default is invalid", key.key());
            }
        }
        assert_eq!(ConfigKey::NotificationChannelId.default_value(), None);
        assert_eq!(ConfigKey::DailyPointsLimit.default_value(), Some("100"));
    }

    #[test]
    fn validates_counts() {
        assert_eq!(ConfigKey::PointsPerMessage.validate(" 7 "), Ok(String::from("7")));
        assert_eq!(ConfigKey::DailyPointsLimit.validate("0"), Ok(String::from("0")));
        assert!(matches!(
            ConfigKey::PointsPerShare.validate("-3"),
            Err(ConfigError::NotACount(_))
        ));
        assert!(ConfigKey::PointsPerImage.validate("ten").is_err());
    }

    #[test]
    fn counts_stay_within_the_points_range() {
        assert_eq!(
            ConfigKey::PointsPerMessage.validate("1000000000"),
            Ok(String::from("1000000000"))
        );
        for oversized in ["1000000001", "9223372036854775807", "9223372036854775808"] {
            assert!(matches!(
                ConfigKey::PointsPerMessage.validate(oversized),
                Err(ConfigError::NotACount(_))
            ));
            assert!(!ConfigKey::DailyPointsLimit.is_valid(oversized));
        }
        assert!(ConfigKey::VoiceChannelUpdateInterval
            .validate("9223372036854775808")
            .is_err());
    }

    #[test]
    fn validates_flags() {
        assert_eq!(
            ConfigKey::DashboardEnabled.validate("Yes"),
            Ok(String::from("true"))
        );
        assert_eq!(
            ConfigKey::MystatsEnabled.validate("off"),
            Ok(String::from("false"))
        );
        assert!(ConfigKey::LevelRolesEnabled.validate("maybe").is_err());
    }

    #[test]
    fn validates_interval_minimum() {
        assert_eq!(
            ConfigKey::VoiceChannelUpdateInterval.validate("59"),
            Err(ConfigError::IntervalTooShort)
        );
        assert_eq!(
            ConfigKey::VoiceChannelUpdateInterval.validate("60"),
            Ok(String::from("60"))
        );
    }

    #[test]
    fn parses_channel_mentions() {
        assert_eq!(parse_channel("<#123>"), Some(ChannelId::new(123)));
        assert_eq!(parse_channel("456"), Some(ChannelId::new(456)));
        assert_eq!(parse_channel("YOUR_CHANNEL_ID"), None);
        assert_eq!(parse_channel("0"), None);
    }

    #[test]
    fn parses_admin_id_lists() {
        assert_eq!(
            parse_user_ids("1, 2,,abc,3"),
            vec![UserId::new(1), UserId::new(2), UserId::new(3)]
        );
    }
}
