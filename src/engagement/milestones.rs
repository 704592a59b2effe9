use crate::{
    config::ConfigKey,
    constants::{GOLD_COLOR, REWARD_CODE_LENGTH},
    database::{db, Database},
    message_utils::format_thousands,
};
use anyhow::Result;
use chrono::Utc;
use entities::{milestone, milestone_log};
use poise::serenity_prelude::{Context, CreateEmbed, CreateEmbedFooter, CreateMessage, Mention, UserId};
use rand::Rng;
use sea_orm::DbErr;
use tracing::{info, warn};

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_reward_code(rng: &mut impl Rng) -> String {
    (0..REWARD_CODE_LENGTH)
        .map(|_| char::from(CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())]))
        .collect()
}

async fn unique_reward_code(db: &Database) -> Result<String, DbErr> {
    loop {
        let code = generate_reward_code(&mut rand::thread_rng());
        if !db.reward_code_exists(&code).await? {
            return Ok(code);
        }
    }
}

pub fn milestone_message(milestone: &milestone::Model) -> String {
    milestone
        .message
        .clone()
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "🎉 Congrats! You've reached a milestone of {} points!",
                format_thousands(milestone.value)
            )
        })
}

/// Records and announces every milestone the member has newly passed.
pub async fn check_milestones(
    ctx: &Context,
    user: UserId,
    total: i64,
) -> Result<Vec<milestone_log::Model>> {
    let db = db().await;
    let mut reached = Vec::new();
    while let Some(milestone) = db.next_unrecorded_milestone(user, total).await? {
        let code = unique_reward_code(db).await?;
        let Some(log) = db
            .record_milestone(user, milestone.value, &code, Utc::now())
            .await?
        else {
            continue;
        };
        info!("{} reached the {} point milestone", user, milestone.value);
        notify(ctx, db, user, &milestone, &log).await?;
        reached.push(log);
    }
    Ok(reached)
}

async fn notify(
    ctx: &Context,
    db: &Database,
    user: UserId,
    milestone: &milestone::Model,
    log: &milestone_log::Model,
) -> Result<()> {
    let mut embed = CreateEmbed::new()
        .title("🏆 Milestone reached!")
        .description(milestone_message(milestone))
        .color(GOLD_COLOR)
        .field("Reward code", format!("`{}`", log.reward_code), true);
    if let Some(reward) = &milestone.reward {
        embed = embed.field("Reward", reward, true);
    }
    embed = embed.footer(CreateEmbedFooter::new(
        "Keep this code, an admin will use it to send your reward.",
    ));
    match user
        .direct_message(ctx, CreateMessage::new().embed(embed))
        .await
    {
        Ok(_) => db.mark_user_notified(log.id).await?,
        Err(err) => warn!("Couldn't DM {} about their milestone: {}", user, err),
    }
    let summary = format!(
        "User: {}\nMilestone: {} points\nReward code: `{}`",
        Mention::User(user),
        format_thousands(milestone.value),
        log.reward_code
    );
    let channel = db.config_channel(ConfigKey::NotificationChannelId).await?;
    let posted = match channel {
        Some(channel) => channel
            .send_message(
                ctx,
                CreateMessage::new().embed(
                    CreateEmbed::new()
                        .title("📢 Milestone reached")
                        .description(&summary)
                        .color(GOLD_COLOR),
                ),
            )
            .await
            .map_err(|err| warn!("Couldn't post to notification channel {}: {}", channel, err))
            .is_ok(),
        None => false,
    };
    if posted {
        db.mark_admin_notified(log.id).await?;
        return Ok(());
    }
    let Some(admin) = db.admin_ids().await?.into_iter().next() else {
        warn!("No admin to notify about reward code {}", log.reward_code);
        return Ok(());
    };
    let warning = format!(
        "⚠️ **Milestone reached but no notification channel is available**\n\n{summary}\n\n\
        Set one with `/config botchannel`."
    );
    if let Err(err) = admin
        .direct_message(ctx, CreateMessage::new().content(warning))
        .await
    {
        warn!("Couldn't DM admin {} about reward code {}: {}", admin, log.reward_code, err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn reward_codes_are_short_uppercase_alphanumerics() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = generate_reward_code(&mut rng);
            assert_eq!(code.len(), REWARD_CODE_LENGTH);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn missing_messages_get_a_default() {
        let mut milestone = milestone::Model {
            value: 2500,
            active: true,
            message: None,
            role_name: None,
            level_based: true,
            reward: None,
        };
        assert_eq!(
            milestone_message(&milestone),
            "🎉 Congrats! You've reached a milestone of 2,500 points!"
        );
        milestone.message = Some(String::from("Nice!"));
        assert_eq!(milestone_message(&milestone), "Nice!");
    }
}
