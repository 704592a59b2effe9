pub use super::admin::Entity as Admin;
pub use super::campaign::Entity as Campaign;
pub use super::config::Entity as Config;
pub use super::engagement_log::Entity as EngagementLog;
pub use super::excluded_member::Entity as ExcludedMember;
pub use super::member::Entity as Member;
pub use super::milestone::Entity as Milestone;
pub use super::milestone_log::Entity as MilestoneLog;
pub use super::tracked_channel::Entity as TrackedChannel;
pub use super::voice_display_channel::Entity as VoiceDisplayChannel;
