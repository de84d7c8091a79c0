mod bot;
mod config;
mod error;
mod flow;
mod imagehost;
mod server;
mod store;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Coverbot starting...");

    // Load configuration
    let config = config::load_config()?;
    tracing::info!(data_dir = %config.data_dir.display(), "Data dir configured");

    tokio::fs::create_dir_all(&config.data_dir).await?;

    // Create bot
    let bot = Bot::new(&config.telegram_token);

    // Register commands with Telegram
    if let Err(e) = bot
        .set_my_commands(bot::commands::BotCommand::bot_commands())
        .await
    {
        tracing::warn!("Failed to set bot commands: {e}");
    }

    let me = bot.get_me().await?;
    tracing::info!(username = me.username(), "Bot identity confirmed");

    // Build shared state and serve webhook deliveries
    let state = bot::AppState::new(config.clone(), bot, me.username().to_string());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Listening for webhook deliveries");

    axum::serve(listener, server::router(state)).await?;

    Ok(())
}
