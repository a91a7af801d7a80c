//! SQLite persistence layer for the time tracker bot.
//!
//! This crate provides async database operations for users, their activity
//! trees and the activity log using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{activity, Database, NewActivity, ROOT_PARENT_ID};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:tracker.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Create a top-level activity
//!     let id = activity::create_activity(
//!         db.pool(),
//!         &NewActivity {
//!             user_id: 42,
//!             name: "Work".to_string(),
//!             parent_id: ROOT_PARENT_ID,
//!             is_leaf: false,
//!             muted: false,
//!         },
//!     )
//!     .await?;
//!     println!("created activity {}", id);
//!
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod activity_log;
pub mod error;
pub mod models;
pub mod user;

pub use error::{DatabaseError, Result};
pub use models::{
    Activity, ActivityFilter, ActivityId, ActivityLogEntry, ChatId, MessageId, NewActivity, User,
    UserId, ROOT_PARENT_ID,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Set high enough to serve the scheduler and concurrent chat events.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Open a private in-memory database on a single long-lived connection.
    ///
    /// Every query goes through the same connection, so the data lives as
    /// long as this `Database` (and its clones).
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
