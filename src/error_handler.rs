use crate::{commands::CommandError, message_utils::failure_embed};
use anyhow::Result;
use poise::{CreateReply, FrameworkError};
use tracing::{error, warn};

#[allow(clippy::too_many_lines)]
pub async fn handle<T: Send + Sync>(error: FrameworkError<'_, T, CommandError>) -> Result<()> {
    match error {
        FrameworkError::Setup { error, .. } => {
            error!("Error during bot setup: {:?}", error);
        }
        FrameworkError::EventHandler { error, event, .. } => error!(
            "Engagement handler failed on {} event: {:?}",
            event.snake_case_name(),
            error
        ),
        FrameworkError::Command { ctx, error, .. } => {
            let error_msg = match error {
                CommandError::Expected(msg) => msg,
                CommandError::Unexpected(err) => {
                    error!(
                        "An unexpected error occured in command {}: {:?}",
                        ctx.command().name,
                        &err
                    );
                    String::from("Something went wrong while running this command. The error has been logged.")
                }
            };
            ctx.send(
                CreateReply::default()
                    .embed(failure_embed(error_msg))
                    .ephemeral(true),
            )
            .await?;
        }
        FrameworkError::SubcommandRequired { ctx } => {
            let subcommands = ctx
                .command()
                .subcommands
                .iter()
                .map(|s| &*s.name)
                .collect::<Vec<_>>();
            let response = format!(
                "You must specify one of the following subcommands: {}",
                subcommands.join(", ")
            );
            ctx.send(
                CreateReply::default()
                    .embed(failure_embed(response))
                    .ephemeral(true),
            )
            .await?;
        }
        FrameworkError::CommandPanic { ctx, payload, .. } => {
            // Not showing the payload to the user because it may contain sensitive info
            error!(
                "Command {} panicked with payload: {:?}",
                ctx.command().name,
                payload
            );
            ctx.send(
                CreateReply::default()
                    .embed(failure_embed("An unexpected internal error has occurred."))
                    .ephemeral(true),
            )
            .await?;
        }
        FrameworkError::ArgumentParse {
            ctx, input, error, ..
        } => {
            // If we caught an argument parse error, give a helpful error message with the
            // command explanation if available
            let usage = ctx.command().help_text.as_ref().map_or(
                "Please check the help menu for usage information.",
                |help_text| &**help_text,
            );
            let response = input.map_or_else(
                || format!("**{error}**\n{usage}"),
                |input| format!("**Cannot parse `{input}` as argument: {error}**\n{usage}"),
            );
            ctx.send(
                CreateReply::default()
                    .embed(failure_embed(response))
                    .ephemeral(true),
            )
            .await?;
        }
        FrameworkError::CommandStructureMismatch {
            ctx, description, ..
        } => {
            error!(
                "Failed to deserialize interaction arguments for `/{}`: {}",
                ctx.command.name, description,
            );
        }
        FrameworkError::CommandCheckFailed { ctx, error, .. } => {
            let response = match error {
                Some(CommandError::Expected(msg)) => msg,
                Some(CommandError::Unexpected(err)) => {
                    error!(
                        "Command check errored in command {} for user {}: {:?}",
                        ctx.command().name,
                        ctx.author().name,
                        err,
                    );
                    String::from("Your permissions could not be verified right now.")
                }
                None => {
                    warn!(
                        "User {} ({}) was denied access to command {}",
                        ctx.author().name,
                        ctx.author().id,
                        ctx.command().name,
                    );
                    String::from("You don't have permission to use this command.")
                }
            };
            ctx.send(
                CreateReply::default()
                    .embed(failure_embed(response))
                    .ephemeral(true),
            )
            .await?;
        }
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let msg = format!(
                "Command cannot be executed because the bot is lacking permissions: {missing_permissions}",
            );
            ctx.send(
                CreateReply::default()
                    .embed(failure_embed(msg))
                    .ephemeral(true),
            )
            .await?;
        }
        FrameworkError::GuildOnly { ctx, .. } => {
            let response = "You cannot run this command in DMs.";
            ctx.send(
                CreateReply::default()
                    .embed(failure_embed(response))
                    .ephemeral(true),
            )
            .await?;
        }
        FrameworkError::UnknownInteraction { interaction, .. } => {
            warn!("Received unknown interaction \"{}\"", interaction.data.name);
        }
        _ => {}
    }
    Ok(())
}
