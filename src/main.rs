use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;

use clipfetch::config;
use clipfetch::telegram::{create_bot, setup_bot_commands};
use clipfetch::{schema, HandlerDeps, RateLimiter, SessionStore, WorkflowController, YtDlpProvider};

/// Main entry point for the Telegram bot.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    pretty_env_logger::init_timed();
    log::info!("Starting clipfetch bot...");

    tokio::fs::create_dir_all(&*config::DOWNLOAD_FOLDER).await?;

    let bot = create_bot()?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {e}");
    }

    let sessions = Arc::new(SessionStore::new());
    let limiter = Arc::new(RateLimiter::from_config());
    let provider = Arc::new(YtDlpProvider::from_config());
    let controller = Arc::new(WorkflowController::new(
        Arc::clone(&sessions),
        Arc::clone(&limiter),
        Arc::clone(&provider),
    ));

    let deps = HandlerDeps {
        sessions,
        controller,
        provider,
    };

    log::info!(
        "Rate limit: {} requests / {}s window, {}s cooldown; max file size: {} MB",
        *config::rate_limit::MAX_REQUESTS,
        *config::rate_limit::WINDOW_SECONDS,
        *config::rate_limit::COOLDOWN_SECONDS,
        *config::limits::MAX_FILE_SIZE_MB
    );

    Dispatcher::builder(bot, schema(deps))
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
