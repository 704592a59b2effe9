use super::{is_admin, CommandError, CommandResult, Context};
use crate::{
    database::db,
    message_utils::{render_lines_reply, success_message},
};
use chrono::{NaiveDate, Utc};
use entities::campaign;
use poise::{
    command,
    serenity_prelude::{ChannelId, GuildChannel, Mention},
};

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("create", "list", "status", "pause", "delete"),
    check = "is_admin",
    category = "Campaigns",
    guild_only,
    ephemeral
)]
/// Run point multiplier campaigns on channels
pub async fn campaign(_: Context<'_>) -> CommandResult {
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        CommandError::Expected(format!("`{value}` is not a date, use YYYY-MM-DD."))
    })
}

fn parse_period(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), CommandError> {
    let (start, end) = (parse_date(start)?, parse_date(end)?);
    if start >= end {
        return Err(CommandError::Expected(String::from(
            "The start date must be before the end date.",
        )));
    }
    Ok((start, end))
}

fn validate_multiplier(multiplier: f64) -> Result<f64, CommandError> {
    if multiplier.is_finite() && multiplier > 0.0 {
        Ok(multiplier)
    } else {
        Err(CommandError::Expected(String::from(
            "The multiplier must be greater than 0.",
        )))
    }
}

fn campaign_line(campaign: &campaign::Model, today: NaiveDate) -> String {
    let status = if !campaign.active {
        "⏸️"
    } else if campaign.start_date > today {
        "⏳"
    } else if campaign.end_date < today {
        "⌛"
    } else {
        "🟢"
    };
    format!(
        "{status} **{}** in {} · x{} · {} to {}",
        campaign.name,
        Mention::Channel(ChannelId::new(campaign.channel as u64)),
        campaign.multiplier,
        campaign.start_date,
        campaign.end_date
    )
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Create or replace the campaign on a channel
pub async fn create(
    ctx: Context<'_>,
    #[description = "Campaign name"] name: String,
    #[description = "Channel the campaign runs in"] channel: GuildChannel,
    #[description = "Point multiplier, e.g. 2 for double points"] multiplier: f64,
    #[description = "First day, YYYY-MM-DD"] start_date: String,
    #[description = "Last day, YYYY-MM-DD"] end_date: String,
) -> CommandResult {
    let multiplier = validate_multiplier(multiplier)?;
    let (start, end) = parse_period(&start_date, &end_date)?;
    db().await
        .add_campaign(channel.id, name.clone(), multiplier, start, end)
        .await?;
    ctx.send(success_message(format!(
        "Campaign **{name}** runs in {} from {start} to {end} with a x{multiplier} multiplier.",
        Mention::Channel(channel.id)
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// List every campaign
pub async fn list(ctx: Context<'_>) -> CommandResult {
    let today = Utc::now().date_naive();
    let lines = db()
        .await
        .all_campaigns()
        .await?
        .iter()
        .map(|campaign| campaign_line(campaign, today))
        .collect::<Vec<_>>();
    ctx.send(render_lines_reply(lines, "📣 Campaigns")).await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Show campaigns running today
pub async fn status(ctx: Context<'_>) -> CommandResult {
    let today = Utc::now().date_naive();
    let lines = db()
        .await
        .active_campaigns(today)
        .await?
        .iter()
        .map(|campaign| campaign_line(campaign, today))
        .collect::<Vec<_>>();
    ctx.send(render_lines_reply(lines, "🟢 Running campaigns"))
        .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Pause or resume the campaign on a channel
pub async fn pause(
    ctx: Context<'_>,
    #[description = "Channel of the campaign"] channel: GuildChannel,
    #[description = "True to pause, false to resume"] paused: bool,
) -> CommandResult {
    if !db().await.set_campaign_active(channel.id, !paused).await? {
        return Err(CommandError::Expected(format!(
            "There is no campaign in {}.",
            Mention::Channel(channel.id)
        )));
    }
    ctx.send(success_message(format!(
        "The campaign in {} is {}.",
        Mention::Channel(channel.id),
        if paused { "paused" } else { "running again" }
    )))
    .await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Delete the campaign on a channel
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Channel of the campaign"] channel: GuildChannel,
) -> CommandResult {
    if !db().await.delete_campaign(channel.id).await? {
        return Err(CommandError::Expected(format!(
            "There is no campaign in {}.",
            Mention::Channel(channel.id)
        )));
    }
    ctx.send(success_message(format!(
        "Deleted the campaign in {}.",
        Mention::Channel(channel.id)
    )))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_must_move_forward() {
        let (start, end) = parse_period("2025-07-01", "2025-07-31").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 7, 31).unwrap());
        assert!(parse_period("2025-07-31", "2025-07-01").is_err());
        assert!(parse_period("2025-07-01", "2025-07-01").is_err());
        assert!(parse_period("07/01/2025", "2025-07-31").is_err());
    }

    #[test]
    fn multipliers_must_be_positive() {
        assert!(validate_multiplier(0.0).is_err());
        assert!(validate_multiplier(-1.5).is_err());
        assert!(validate_multiplier(f64::NAN).is_err());
        assert_eq!(validate_multiplier(2.0).ok(), Some(2.0));
    }

    #[test]
    fn campaign_status_follows_the_dates() {
        let campaign = campaign::Model {
            channel: 42,
            name: String::from("Summer"),
            multiplier: 2.0,
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
            active: true,
        };
        let during = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        assert!(campaign_line(&campaign, during).starts_with("🟢 **Summer** in <#42>"));
        let after = NaiveDate::from_ymd_opt(2025, 8, 10).unwrap();
        assert!(campaign_line(&campaign, after).starts_with("⌛"));
    }
}
