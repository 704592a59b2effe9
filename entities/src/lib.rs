pub mod prelude;

pub mod admin;
pub mod campaign;
pub mod config;
pub mod engagement_log;
pub mod excluded_member;
pub mod member;
pub mod milestone;
pub mod milestone_log;
pub mod tracked_channel;
pub mod voice_display_channel;
