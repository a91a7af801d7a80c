//! Personal time tracker behind a chat bot.
//!
//! The bot asks each user "what are you doing?" at a fixed interval inside a
//! daily window, stores the answer against a user-defined tree of activities
//! and reports how time was spent.
//!
//! # Architecture
//!
//! ```text
//! chat transport (tracker-bot)
//!          ↓ InboundEvent
//! ┌──────────────────────────────────────────────────────────┐
//! │                        TRACKER                           │
//! │                                                          │
//! │  commands / buttons → handlers                           │
//! │      • tree      activity taxonomy (add, mute, delete)   │
//! │      • stats     durations, periods, comparisons         │
//! │      • transfer  YAML export / import                    │
//! │  free text → session registry (waiting flows)            │
//! │                                                          │
//! │  Scheduler ── every tick ──→ prompt due users            │
//! └──────────────────────────────────────────────────────────┘
//!          ↓ MessageSender
//! chat transport
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tracker::{shutdown, LoggingSender, Scheduler, Tracker, TrackerConfig};
//!
//! let config = TrackerConfig::from_env()?;
//! let (trigger, shutdown) = shutdown::channel();
//! let tracker = Tracker::new(pool, Arc::new(LoggingSender::default()), config, shutdown.clone());
//!
//! tokio::spawn(Scheduler::new(tracker.clone()).run(shutdown));
//! tracker.handle(event).await;
//! ```

mod callback;
mod chart;
mod command;
mod config;
mod error;
mod event;
mod handlers;
mod keyboard;
mod locks;
mod picker;
pub mod scheduler;
mod sender;
pub mod session;
pub mod shutdown;
pub mod stats;
mod tracker;
pub mod transfer;
pub mod tree;

// Public exports
pub use callback::CallbackCommand;
pub use chart::{ChartFile, ChartPayload, ChartRenderer, CommandChartRenderer, RENDER_TIMEOUT};
pub use command::Command;
pub use config::{sqlite_url_from_path, TrackerConfig, DEFAULT_INPUT_TIMEOUT_SECS, DEFAULT_TICK_SECS};
pub use error::{Result, TrackerError};
pub use event::{EventKind, InboundEvent};
pub use keyboard::{InlineButton, InlineKeyboard, Markup};
pub use locks::UserLocks;
pub use picker::{Picker, PROMPT_TEXT};
pub use scheduler::{Decision, Schedule, Scheduler, TickReport};
pub use sender::{LoggingSender, MessageSender, NoOpSender};
pub use session::{Delivery, SessionHandle, SessionRegistry, SessionState};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use stats::{Period, PeriodPreset};
pub use tracker::Tracker;
pub use tree::{ActivityForest, ActivityRoute};
