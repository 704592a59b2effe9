use super::{is_admin, CommandError, CommandResult, Context};
use crate::{
    database::db,
    message_utils::{format_thousands, render_lines_reply, success_message},
};
use poise::{
    command,
    serenity_prelude::{Mention, UserId},
};

#[allow(clippy::unused_async)]
#[command(
    slash_command,
    subcommands("mark", "markbatch", "pending"),
    check = "is_admin",
    category = "Rewards",
    guild_only,
    ephemeral
)]
/// Track milestone rewards
pub async fn reward(_: Context<'_>) -> CommandResult {
    Ok(())
}

/// Normalizes a space or comma separated code list, keeping the first occurrence of each code.
fn parse_codes(input: &str) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for code in input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|code| !code.is_empty())
        .map(str::to_ascii_uppercase)
    {
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

enum MarkResult {
    Marked,
    AlreadySent,
    Unknown,
}

async fn mark_code(code: &str) -> Result<MarkResult, CommandError> {
    let db = db().await;
    if db.mark_reward_sent(code).await? {
        Ok(MarkResult::Marked)
    } else if db.reward_code_exists(code).await? {
        Ok(MarkResult::AlreadySent)
    } else {
        Ok(MarkResult::Unknown)
    }
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Mark a reward code as sent
pub async fn mark(
    ctx: Context<'_>,
    #[description = "The reward code"] code: String,
) -> CommandResult {
    let code = code.trim().to_ascii_uppercase();
    match mark_code(&code).await? {
        MarkResult::Marked => {
            ctx.send(success_message(format!("Reward `{code}` marked as sent.")))
                .await?;
            Ok(())
        }
        MarkResult::AlreadySent => Err(CommandError::Expected(format!(
            "Reward `{code}` was already marked as sent."
        ))),
        MarkResult::Unknown => Err(CommandError::Expected(format!(
            "`{code}` is not a known reward code."
        ))),
    }
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// Mark several reward codes as sent
pub async fn markbatch(
    ctx: Context<'_>,
    #[description = "Codes separated by spaces"] codes: String,
) -> CommandResult {
    let codes = parse_codes(&codes);
    if codes.is_empty() {
        return Err(CommandError::Expected(String::from(
            "Give at least one reward code.",
        )));
    }
    let (mut marked, mut already_sent, mut unknown) = (Vec::new(), Vec::new(), Vec::new());
    for code in codes {
        match mark_code(&code).await? {
            MarkResult::Marked => marked.push(code),
            MarkResult::AlreadySent => already_sent.push(code),
            MarkResult::Unknown => unknown.push(code),
        }
    }
    let mut summary = format!("Marked {} rewards as sent.", marked.len());
    if !already_sent.is_empty() {
        summary.push_str(&format!("\nAlready sent: `{}`", already_sent.join("`, `")));
    }
    if !unknown.is_empty() {
        summary.push_str(&format!("\nUnknown codes: `{}`", unknown.join("`, `")));
    }
    ctx.send(success_message(summary)).await?;
    Ok(())
}

#[command(slash_command, check = "is_admin", guild_only, ephemeral)]
/// List rewards that have not been sent yet
pub async fn pending(ctx: Context<'_>) -> CommandResult {
    let lines = db()
        .await
        .pending_rewards()
        .await?
        .into_iter()
        .map(|log| {
            format!(
                "`{}` · {} · {} points · <t:{}:R>",
                log.reward_code,
                Mention::User(UserId::new(log.member as u64)),
                format_thousands(log.milestone),
                log.reached_at
            )
        })
        .collect::<Vec<_>>();
    ctx.send(render_lines_reply(lines, "🎁 Pending rewards"))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_normalized_and_deduplicated() {
        assert_eq!(
            parse_codes(" ab12c  XY9Z0,ab12c\nqq111 "),
            vec!["AB12C", "XY9Z0", "QQ111"]
        );
        assert!(parse_codes("   ").is_empty());
    }
}
