use crate::{config::ConfigKey, database::db, ratelimit::ratelimiter};
use ahash::RandomState;
use anyhow::Result;
use dashmap::DashSet;
use poise::serenity_prelude::{Context, Error as SerenityError, GuildId, Member, RoleId, UserId};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Role changes needed to bring one member in line with their level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePlan {
    pub add: Option<RoleId>,
    pub remove: Vec<RoleId>,
}

impl RolePlan {
    pub fn is_empty(&self) -> bool {
        self.add.is_none() && self.remove.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub checked: usize,
    pub added: usize,
    pub removed: usize,
    pub errors: usize,
}

/// Level roles are matched by name; the member keeps only the role of the
/// highest role-bearing milestone at or below their level.
pub fn plan_role_changes(
    level: i64,
    role_milestones: &[(i64, String)],
    guild_roles: &[(RoleId, String)],
    member_roles: &[RoleId],
) -> RolePlan {
    let target_name = role_milestones
        .iter()
        .filter(|(value, _)| level > 0 && *value <= level)
        .max_by_key(|(value, _)| *value)
        .map(|(_, name)| name.as_str());
    let target = target_name.and_then(|target_name| {
        guild_roles
            .iter()
            .find(|(_, name)| name == target_name)
            .map(|(id, _)| *id)
    });
    let level_roles = guild_roles
        .iter()
        .filter(|(_, name)| role_milestones.iter().any(|(_, role)| role == name))
        .map(|(id, _)| *id)
        .collect::<Vec<_>>();
    RolePlan {
        add: target.filter(|target| !member_roles.contains(target)),
        remove: member_roles
            .iter()
            .filter(|role| level_roles.contains(role) && Some(**role) != target)
            .copied()
            .collect(),
    }
}

async fn role_milestones() -> Result<Vec<(i64, String)>> {
    Ok(db()
        .await
        .role_milestones()
        .await?
        .into_iter()
        .filter_map(|milestone| milestone.role_name.map(|role| (milestone.value, role)))
        .collect())
}

async fn guild_roles(ctx: &Context, guild: GuildId) -> Result<Vec<(RoleId, String)>> {
    Ok(guild
        .roles(&ctx.http)
        .await?
        .into_iter()
        .map(|(id, role)| (id, role.name))
        .collect())
}

async fn apply(ctx: &Context, member: &Member, plan: &RolePlan) -> Result<(), SerenityError> {
    if !plan.remove.is_empty() {
        ratelimiter().roles.acquire_one().await;
        member.remove_roles(ctx, &plan.remove).await?;
    }
    if let Some(role) = plan.add {
        ratelimiter().roles.acquire_one().await;
        member.add_role(ctx, role).await?;
    }
    Ok(())
}

/// Returns the applied plan, empty when the member is unknown.
pub async fn sync_member(ctx: &Context, guild: GuildId, user: UserId) -> Result<RolePlan> {
    let Some(stored) = db().await.member(user).await? else {
        return Ok(RolePlan::default());
    };
    let milestones = role_milestones().await?;
    let roles = guild_roles(ctx, guild).await?;
    let member = guild.member(ctx, user).await?;
    let plan = plan_role_changes(stored.level, &milestones, &roles, &member.roles);
    apply(ctx, &member, &plan).await?;
    Ok(plan)
}

pub async fn sync_guild(ctx: &Context, guild: GuildId) -> Result<SyncSummary> {
    let milestones = role_milestones().await?;
    let roles = guild_roles(ctx, guild).await?;
    let mut summary = SyncSummary::default();
    for stored in db().await.members().await? {
        let user = UserId::new(stored.id as u64);
        let Ok(member) = guild.member(ctx, user).await else {
            continue;
        };
        summary.checked += 1;
        let plan = plan_role_changes(stored.level, &milestones, &roles, &member.roles);
        if plan.is_empty() {
            continue;
        }
        match apply(ctx, &member, &plan).await {
            Ok(()) => {
                summary.added += usize::from(plan.add.is_some());
                summary.removed += plan.remove.len();
            }
            Err(err) => {
                warn!("Failed to update roles of {} in {}: {}", user, guild, err);
                summary.errors += 1;
            }
        }
    }
    info!(
        "Role sync in {}: {} checked, {} added, {} removed, {} errors",
        guild, summary.checked, summary.added, summary.removed, summary.errors
    );
    Ok(summary)
}

static SYNCED_GUILDS: OnceLock<DashSet<GuildId, RandomState>> = OnceLock::new();

/// Syncs a guild the first time it becomes available, if enabled.
pub async fn sync_on_startup(ctx: &Context, guild: GuildId) -> Result<()> {
    let synced = SYNCED_GUILDS.get_or_init(|| DashSet::with_hasher(RandomState::new()));
    if !synced.insert(guild) {
        return Ok(());
    }
    let db = db().await;
    if db.config_flag(ConfigKey::AutoAssignRolesOnStartup).await?
        && db.config_flag(ConfigKey::LevelRolesEnabled).await?
    {
        sync_guild(ctx, guild).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Vec<(i64, String)> {
        vec![
            (1000, String::from("Pit Novice")),
            (50000, String::from("TTP Superfan")),
        ]
    }

    fn guild() -> Vec<(RoleId, String)> {
        vec![
            (RoleId::new(1), String::from("Pit Novice")),
            (RoleId::new(2), String::from("TTP Superfan")),
            (RoleId::new(3), String::from("Moderator")),
        ]
    }

    #[test]
    fn level_zero_removes_every_level_role() {
        let plan = plan_role_changes(0, &ladder(), &guild(), &[RoleId::new(1), RoleId::new(3)]);
        assert_eq!(
            plan,
            RolePlan {
                add: None,
                remove: vec![RoleId::new(1)]
            }
        );
    }

    #[test]
    fn highest_reached_role_replaces_lower_ones() {
        let plan = plan_role_changes(50000, &ladder(), &guild(), &[RoleId::new(1)]);
        assert_eq!(
            plan,
            RolePlan {
                add: Some(RoleId::new(2)),
                remove: vec![RoleId::new(1)]
            }
        );
    }

    #[test]
    fn members_already_in_sync_need_nothing() {
        let plan = plan_role_changes(15000, &ladder(), &guild(), &[RoleId::new(1), RoleId::new(3)]);
        assert!(plan.is_empty());
    }

    #[test]
    fn missing_guild_roles_are_skipped() {
        let roles = vec![(RoleId::new(3), String::from("Moderator"))];
        let plan = plan_role_changes(5000, &ladder(), &roles, &[]);
        assert!(plan.is_empty());
    }
}
