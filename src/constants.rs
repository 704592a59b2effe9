use std::time::Duration;

pub const SUCCESS_COLOR: u32 = 0x57F287;
pub const FAILURE_COLOR: u32 = 0xED4245;
pub const INFO_COLOR: u32 = 0x5865F2;
pub const GOLD_COLOR: u32 = 0xFFD700;

pub const DESCRIPTION_MAX_LENGTH: usize = 4096;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/database.db?mode=rwc";

pub const MAX_POINTS_AMOUNT: i64 = 1_000_000_000;
pub const LEADERBOARD_SIZE: u64 = 10;
pub const REWARD_CODE_LENGTH: usize = 5;

pub const INVITE_REFRESH_DELAY: Duration = Duration::from_secs(30);
pub const NAME_TIMEOUT: Duration = Duration::from_secs(3);

pub const MIN_VOICE_UPDATE_INTERVAL: u64 = 60;
pub const VOICE_CATEGORY_NAME: &str = "═════Top Members═════";
pub const CHANNEL_NAME_MAX_LENGTH: usize = 100;
pub const VOICE_DISPLAY_SLOTS: usize = 3;
