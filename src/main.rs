#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::unreadable_literal,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

mod commands;
mod config;
mod constants;
mod database;
mod engagement;
mod error_handler;
mod message_utils;
mod names;
mod ratelimit;
mod render;
mod retry_strategies;
mod roles;
mod voice_display;

use anyhow::Result;
use commands::{
    admin, campaign, channel, exclusion, exportdb, help, milestone, points, public, reward, role,
    settings, stats, voicedisplay,
};
use database::db;
use engagement::invites;
use poise::{
    builtins,
    serenity_prelude::{ClientBuilder, Command, CreateAllowedMentions, GatewayIntents},
    Framework, FrameworkOptions,
};
use tokio::task;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let settings = config::init_settings(config::Settings::from_env()?);
    db().await
        .seed_admins(settings.admin_ids.iter().copied())
        .await?;
    info!("Database ready, {} admins seeded from the environment", settings.admin_ids.len());
    let options = FrameworkOptions {
        commands: vec![
            public::leaderboard(),
            public::dashboard(),
            public::mystats(),
            help::help(),
            stats::stats(),
            points::points(),
            milestone::milestone(),
            campaign::campaign(),
            reward::reward(),
            settings::config(),
            role::roles(),
            exclusion::exclusion(),
            channel::channel(),
            admin::admin(),
            exportdb::exportdb(),
            voicedisplay::voicedisplay(),
        ],
        on_error: |err| {
            Box::pin(async move {
                if let Err(err) = error_handler::handle(err).await {
                    error!("Error while handling error: {}", err);
                }
            })
        },
        event_handler: |ctx, event, framework, _| {
            Box::pin(engagement::handle_event(ctx, event, framework))
        },
        allowed_mentions: Some(
            CreateAllowedMentions::new()
                .all_roles(false)
                .all_users(false)
                .replied_user(true),
        ),
        ..Default::default()
    };
    let framework = Framework::builder()
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                task::spawn(invites::refresh_loop(ctx.clone()));
                task::spawn(voice_display::update_loop(ctx.clone()));
                Command::set_global_commands(
                    ctx,
                    builtins::create_application_commands(&framework.options().commands),
                )
                .await?;
                Ok(())
            })
        })
        .options(options)
        .build();
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::GUILD_INVITES;
    let mut client = ClientBuilder::new(&settings.token, intents)
        .framework(framework)
        .await?;
    Ok(client.start().await?)
}
