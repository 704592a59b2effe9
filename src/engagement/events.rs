use super::{after_award, award_activity};
use crate::database::{db, Activity};
use anyhow::Result;
use chrono::Utc;
use poise::serenity_prelude::{Context, Message, Reaction};
use regex::Regex;
use std::sync::OnceLock;

static URL: OnceLock<Regex> = OnceLock::new();

fn url_pattern() -> &'static Regex {
    URL.get_or_init(|| Regex::new(r"https?://\S+").expect("URL pattern should compile"))
}

/// Images win over links, links over plain text.
pub fn classify_message<'a>(
    content: &str,
    attachment_types: impl IntoIterator<Item = Option<&'a str>>,
) -> Activity {
    if attachment_types
        .into_iter()
        .flatten()
        .any(|content_type| content_type.starts_with("image/"))
    {
        Activity::Image
    } else if url_pattern().is_match(content) {
        Activity::Share
    } else {
        Activity::Message
    }
}

pub async fn on_message(ctx: &Context, msg: &Message) -> Result<()> {
    if msg.author.bot {
        return Ok(());
    }
    let Some(guild) = msg.guild_id else {
        return Ok(());
    };
    if !db().await.is_tracked(msg.channel_id).await? {
        return Ok(());
    }
    let activity = classify_message(
        &msg.content,
        msg.attachments
            .iter()
            .map(|attachment| attachment.content_type.as_deref()),
    );
    let outcome = award_activity(
        msg.author.id,
        activity,
        Some(msg.id.to_string()),
        Some(msg.channel_id),
        Utc::now(),
    )
    .await?;
    after_award(ctx, guild, msg.author.id, &outcome).await
}

pub async fn on_reaction(ctx: &Context, reaction: &Reaction) -> Result<()> {
    let (Some(guild), Some(user)) = (reaction.guild_id, reaction.user_id) else {
        return Ok(());
    };
    let db = db().await;
    if !db.is_tracked(reaction.channel_id).await?
        || db.has_reacted(user, reaction.message_id).await?
    {
        return Ok(());
    }
    if reaction.user(ctx).await?.bot {
        return Ok(());
    }
    let outcome = award_activity(
        user,
        Activity::Reaction,
        Some(reaction.message_id.to_string()),
        Some(reaction.channel_id),
        Utc::now(),
    )
    .await?;
    after_award(ctx, guild, user, &outcome).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_take_priority() {
        assert_eq!(
            classify_message("look https://example.com", [Some("image/png")]),
            Activity::Image
        );
        assert_eq!(
            classify_message("", [None, Some("image/jpeg")]),
            Activity::Image
        );
    }

    #[test]
    fn links_are_shares() {
        assert_eq!(
            classify_message("read http://example.com/post", [Some("application/pdf")]),
            Activity::Share
        );
        assert_eq!(
            classify_message("https://x.com/status/1", std::iter::empty()),
            Activity::Share
        );
    }

    #[test]
    fn everything_else_is_a_message() {
        assert_eq!(classify_message("gm everyone", []), Activity::Message);
        assert_eq!(classify_message("example.com", [None]), Activity::Message);
        assert_eq!(classify_message("ftp://files", [Some("text/plain")]), Activity::Message);
    }
}
