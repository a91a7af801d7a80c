//! Time tracker bot.
//!
//! Configuration via .env file or environment variables:
//!   TELEGRAM_TOKEN              - Bot token (required)
//!   TELEGRAM_API_URL            - Bot API server (default: https://api.telegram.org)
//!   TELEGRAM_POLL_TIMEOUT_SECS  - Long-poll timeout (default: 60)
//!   SQLITE_PATH                 - Database path or URL (default: ./data/tracker.db)
//!   TRACKER_TICK_SECS           - Scheduler period (default: 5)
//!   TRACKER_INPUT_TIMEOUT_SECS  - Wait for a typed answer (default: 300)
//!   TRACKER_CHART_COMMAND       - Chart renderer; text breakdowns when unset
//!   TRACKER_CHART_DIR           - Scratch directory for chart files
//!   RUST_LOG                    - Log filter (default: info)

mod config;
mod listener;
mod sender;

use std::sync::Arc;

use database::Database;
use telegram_client::{BotCommand, TelegramClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracker::{shutdown, Command, Scheduler, Tracker, TrackerConfig};

use crate::config::BotConfig;
use crate::sender::TelegramSender;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bot_config = BotConfig::from_env()?;
    let config = TrackerConfig::from_env()?;

    info!("Opening database at {}", config.sqlite_url);
    let db = Database::connect(&config.sqlite_url).await?;
    db.migrate().await?;

    let client = TelegramClient::connect(bot_config.telegram).await?;
    let commands = Command::ALL
        .iter()
        .map(|command| BotCommand::new(command.name(), command.description()))
        .collect();
    if let Err(e) = client.set_my_commands(commands).await {
        warn!("Failed to publish the command menu: {}", e);
    }

    let (trigger, shutdown) = shutdown::channel();
    let sender = Arc::new(TelegramSender::new(client.clone()));
    let tracker = Tracker::new(db.pool().clone(), sender, config, shutdown.clone());

    let scheduler = tokio::spawn(Scheduler::new(tracker.clone()).run(shutdown.clone()));
    let mut listener_task = tokio::spawn(listener::run(client, tracker, shutdown));

    info!("Time tracker bot is running. Press Ctrl+C to stop.");

    let listener_done = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
            false
        }
        _ = &mut listener_task => {
            warn!("Listener exited, shutting down");
            true
        }
    };

    trigger.trigger();
    if let Err(e) = scheduler.await {
        warn!("Scheduler task failed: {}", e);
    }
    if !listener_done {
        let _ = listener_task.await;
    }
    db.close().await;

    Ok(())
}
