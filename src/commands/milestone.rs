use super::{guild_id, is_admin, CommandError, CommandResult, Context};
use crate::{
    database::db,
    engagement::milestones::milestone_message,
    message_utils::{format_thousands, render_lines_reply, success_message},
};
use poise::{
    command,
    serenity_prelude::{GuildId, Role},
};

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("list", "add", "remove", "message", "role", "reward"),
    check = "is_admin",
    category = "Milestones",
    guild_only,
    ephemeral
)]
/// Manage point milestones
pub async fn milestone(_: Context<'_>) -> CommandResult {
    Ok(())
}

/// Roles the bot cannot hand out are rejected up front.
fn check_assignable(
    name: &str,
    position: u16,
    reserved: bool,
    bot_top_position: u16,
) -> Result<(), CommandError> {
    if reserved {
        return Err(CommandError::Expected(format!(
            "The `{name}` role can't be assigned, it is either @everyone or managed by an integration."
        )));
    }
    if position >= bot_top_position {
        return Err(CommandError::Expected(format!(
            "I don't have permission to manage the `{name}` role. Move my role above it first."
        )));
    }
    Ok(())
}

async fn bot_top_position(ctx: Context<'_>, guild: GuildId) -> Result<u16, CommandError> {
    let member = guild
        .member(ctx.serenity_context(), ctx.framework().bot_id)
        .await?;
    let roles = guild.roles(ctx.serenity_context()).await?;
    Ok(member
        .roles
        .iter()
        .filter_map(|role| roles.get(role))
        .map(|role| role.position)
        .max()
        .unwrap_or(0))
}

async fn validate_role(ctx: Context<'_>, role: &Role) -> CommandResult {
    let guild = guild_id(ctx)?;
    check_assignable(
        &role.name,
        role.position,
        role.id.get() == guild.get() || role.managed,
        bot_top_position(ctx, guild).await?,
    )
}

fn not_found(value: i64) -> CommandError {
    CommandError::Expected(format!(
        "There is no milestone at {} points.",
        format_thousands(value)
    ))
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// List active milestones
pub async fn list(ctx: Context<'_>) -> CommandResult {
    let lines = db()
        .await
        .active_milestones()
        .await?
        .into_iter()
        .map(|milestone| {
            format!(
                "**{} points** · {} · {}\n{}",
                format_thousands(milestone.value),
                milestone
                    .role_name
                    .as_deref()
                    .map_or_else(|| String::from("no role"), |role| format!("role `{role}`")),
                milestone
                    .reward
                    .as_deref()
                    .map_or_else(|| String::from("no reward"), |reward| format!("reward: {reward}")),
                milestone_message(&milestone)
            )
        })
        .collect::<Vec<_>>();
    ctx.send(render_lines_reply(lines, "🎯 Active milestones"))
        .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Create or replace a milestone
pub async fn add(
    ctx: Context<'_>,
    #[description = "Points needed"]
    #[min = 1]
    value: i64,
    #[description = "Message sent to members who reach it"] message: String,
    #[description = "Reward handed out by admins"] reward: Option<String>,
    #[description = "Role given to members who reach it"] role: Option<Role>,
) -> CommandResult {
    if value < 1 {
        return Err(CommandError::Expected(String::from(
            "Milestone values must be at least 1.",
        )));
    }
    if let Some(role) = &role {
        validate_role(ctx, role).await?;
    }
    db().await
        .add_milestone(
            value,
            message,
            reward.filter(|reward| !reward.trim().is_empty()),
            role.as_ref().map(|role| role.name.clone()),
        )
        .await?;
    ctx.send(success_message(match role {
        Some(role) => format!(
            "Milestone created at {} points with role `{}`.",
            format_thousands(value),
            role.name
        ),
        None => format!("Milestone created at {} points.", format_thousands(value)),
    }))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Deactivate a milestone
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Milestone value"] value: i64,
) -> CommandResult {
    if !db().await.set_milestone_active(value, false).await? {
        return Err(not_found(value));
    }
    ctx.send(success_message(format!(
        "Milestone at {} points deactivated.",
        format_thousands(value)
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Change a milestone's message
pub async fn message(
    ctx: Context<'_>,
    #[description = "Milestone value"] value: i64,
    #[description = "New message"] message: String,
) -> CommandResult {
    if !db().await.set_milestone_message(value, message).await? {
        return Err(not_found(value));
    }
    ctx.send(success_message(format!(
        "Updated the message for {} points.",
        format_thousands(value)
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Change or clear a milestone's role
pub async fn role(
    ctx: Context<'_>,
    #[description = "Milestone value"] value: i64,
    #[description = "Role to assign, leave empty to clear"] role: Option<Role>,
) -> CommandResult {
    if let Some(role) = &role {
        validate_role(ctx, role).await?;
    }
    let role_name = role.map(|role| role.name);
    if !db()
        .await
        .set_milestone_role(value, role_name.clone())
        .await?
    {
        return Err(not_found(value));
    }
    ctx.send(success_message(match role_name {
        Some(name) => format!(
            "Members reaching {} points now get `{name}`.",
            format_thousands(value)
        ),
        None => format!("Cleared the role for {} points.", format_thousands(value)),
    }))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Change or clear a milestone's reward
pub async fn reward(
    ctx: Context<'_>,
    #[description = "Milestone value"] value: i64,
    #[description = "Reward description, leave empty to clear"] reward: Option<String>,
) -> CommandResult {
    let reward = reward.filter(|reward| !reward.trim().is_empty());
    if !db()
        .await
        .set_milestone_reward(value, reward.clone())
        .await?
    {
        return Err(not_found(value));
    }
    ctx.send(success_message(match reward {
        Some(reward) => format!(
            "Reward for {} points set to {reward}.",
            format_thousands(value)
        ),
        None => format!("Cleared the reward for {} points.", format_thousands(value)),
    }))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_above_the_bot_are_rejected() {
        assert!(check_assignable("Pit Novice", 3, false, 4).is_ok());
        assert!(check_assignable("Pit Novice", 4, false, 4).is_err());
        assert!(check_assignable("Pit Novice", 9, false, 4).is_err());
    }

    #[test]
    fn everyone_and_managed_roles_are_rejected() {
        assert!(check_assignable("@everyone", 0, true, 4).is_err());
    }
}
