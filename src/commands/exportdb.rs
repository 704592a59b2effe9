use super::{is_admin, CommandResult, Context};
use crate::{database::db, message_utils::success_embed};
use chrono::Utc;
use poise::{command, serenity_prelude::CreateAttachment, CreateReply};
use std::env;
use tokio::fs;
use tracing::{info, warn};

#[command(
    slash_command,
    check = "is_admin",
    category = "Database",
    required_bot_permissions = "ATTACH_FILES",
    guild_only,
    ephemeral
)]
/// Download a copy of the database
pub async fn exportdb(ctx: Context<'_>) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let file_name = format!("database_backup_{}.db", Utc::now().format("%Y%m%d_%H%M%S"));
    let path = env::temp_dir().join(&file_name);
    db().await.export_to(&path).await?;
    let data = fs::read(&path).await;
    if let Err(err) = fs::remove_file(&path).await {
        warn!("Failed to remove export {}: {}", path.display(), err);
    }
    let data = data.map_err(anyhow::Error::from)?;
    info!("{} exported the database ({} bytes)", ctx.author().id, data.len());
    ctx.send(
        CreateReply::default()
            .embed(success_embed(format!("Database exported as `{file_name}`.")))
            .attachment(CreateAttachment::bytes(data, file_name)),
    )
    .await?;
    Ok(())
}
