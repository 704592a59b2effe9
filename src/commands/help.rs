use super::{CommandResult, Context};
use crate::{constants::INFO_COLOR, database::db};
use poise::{command, serenity_prelude::CreateEmbed, CreateReply};

const UNCATEGORIZED: &str = "General";

/// `/name` plus its subcommands, with the description.
fn usage(command: &poise::Command<(), super::CommandError>) -> String {
    let description = command
        .description
        .as_deref()
        .unwrap_or("No description");
    if command.subcommands.is_empty() {
        format!("`/{}` {description}", command.name)
    } else {
        let subcommands = command
            .subcommands
            .iter()
            .map(|subcommand| subcommand.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("`/{}` {description}\n↳ {subcommands}", command.name)
    }
}

/// Groups commands by category in registration order; admin-only ones only for admins.
fn categories<'a>(
    commands: &'a [poise::Command<(), super::CommandError>],
    show_admin: bool,
) -> Vec<(&'a str, Vec<String>)> {
    let mut res: Vec<(&str, Vec<String>)> = Vec::new();
    for command in commands
        .iter()
        .filter(|command| show_admin || command.checks.is_empty())
    {
        let category = command.category.as_deref().unwrap_or(UNCATEGORIZED);
        let line = usage(command);
        match res.iter_mut().find(|(name, _)| *name == category) {
            Some((_, lines)) => lines.push(line),
            None => res.push((category, vec![line])),
        }
    }
    res
}

/// An overview of the bot's commands
#[command(slash_command, ephemeral)]
pub async fn help(ctx: Context<'_>) -> CommandResult {
    let show_admin = db().await.is_admin(ctx.author().id).await?;
    let mut embed = CreateEmbed::new()
        .title("📖 Commands")
        .color(INFO_COLOR)
        .description("Earn points by chatting, reacting, sharing links and inviting friends.");
    for (category, lines) in categories(&ctx.framework().options().commands, show_admin) {
        embed = embed.field(category, lines.join("\n"), false);
    }
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{admin, public, stats};

    #[test]
    fn admin_categories_are_hidden_from_members() {
        let commands = vec![
            public::leaderboard(),
            public::dashboard(),
            admin::admin(),
            stats::stats(),
            help(),
        ];
        let member_view = categories(&commands, false);
        assert_eq!(
            member_view
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>(),
            vec!["Community", "General"]
        );
        let admin_view = categories(&commands, true);
        assert!(admin_view.iter().any(|(name, lines)| *name == "Admins"
            && lines[0].starts_with("`/admin` Manage bot admins\n↳ list, add, remove")));
    }
}
