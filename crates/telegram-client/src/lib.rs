//! Telegram Bot API client library.
//!
//! This crate provides a small Rust client for the Telegram Bot API over
//! HTTPS. It supports:
//!
//! - Sending, editing and deleting messages with inline keyboards
//! - Uploading documents and photos, downloading files
//! - Receiving updates via long polling with retry and backoff
//!
//! # Example
//!
//! ```no_run
//! use telegram_client::{TelegramClient, TelegramConfig};
//!
//! # async fn example() -> Result<(), telegram_client::TelegramError> {
//! let client = TelegramClient::connect(TelegramConfig::new("123:ABC")).await?;
//!
//! use futures::StreamExt;
//! let mut updates = telegram_client::subscribe(&client);
//! while let Some(result) = updates.next().await {
//!     if let Ok(update) = result {
//!         if let Some(message) = update.message {
//!             client.send_text(message.chat.id, "Hello!").await?;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod updates;

pub use client::TelegramClient;
pub use config::{TelegramConfig, DEFAULT_API_URL};
pub use error::TelegramError;
pub use types::*;
pub use updates::{subscribe, subscribe_with_reconnect, ReconnectConfig, UpdateStream};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
