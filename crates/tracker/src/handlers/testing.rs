//! Test harness: an in-memory tracker wired to a recording sender.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use database::{user, Database, MessageId, User, UserId};
use sqlx::SqlitePool;

use crate::config::TrackerConfig;
use crate::event::{EventKind, InboundEvent};
use crate::sender::testing::RecordingSender;
use crate::shutdown::{self, ShutdownTrigger};
use crate::tracker::Tracker;

pub(crate) struct Harness {
    pub tracker: Tracker,
    pub sender: Arc<RecordingSender>,
    pub trigger: ShutdownTrigger,
    db: Database,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(TrackerConfig {
            input_timeout: Duration::from_secs(2),
            ..TrackerConfig::default()
        })
        .await
    }

    pub async fn with_config(config: TrackerConfig) -> Self {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let sender = Arc::new(RecordingSender::new());
        let (trigger, shutdown) = shutdown::channel();
        let tracker = Tracker::new(db.pool().clone(), sender.clone(), config, shutdown)
            .with_chart_renderer(None);
        Self {
            tracker,
            sender,
            trigger,
            db,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }

    /// A user with a prompt interval and a whole-day window, not enabled.
    pub async fn scheduled_user(&self, id: UserId, interval_minutes: i64) -> User {
        let mut user = user::ensure_user(self.pool(), id, id).await.unwrap();
        user.interval_minutes = Some(interval_minutes);
        user.morning_start_hour = Some(0);
        user.evening_finish_hour = Some(23);
        user::update_user(self.pool(), &user).await.unwrap();
        user
    }

    pub async fn user(&self, id: UserId) -> User {
        user::get_user(self.pool(), id).await.unwrap()
    }
}

fn event(user_id: UserId, message_id: MessageId, kind: EventKind) -> InboundEvent {
    InboundEvent {
        user_id,
        chat_id: user_id,
        message_id,
        kind,
    }
}

/// `/name args` from `user_id`.
pub(crate) fn command(user_id: UserId, line: &str) -> InboundEvent {
    let line = line.trim_start_matches('/');
    let (name, args) = line.split_once(' ').unwrap_or((line, ""));
    event(
        user_id,
        1,
        EventKind::Command {
            name: name.to_string(),
            args: args.trim().to_string(),
        },
    )
}

pub(crate) fn text(user_id: UserId, text: &str) -> InboundEvent {
    event(user_id, 2, EventKind::Text(text.to_string()))
}

pub(crate) fn document(user_id: UserId, file_id: &str, file_name: &str) -> InboundEvent {
    event(
        user_id,
        3,
        EventKind::Document {
            file_id: file_id.to_string(),
            file_name: Some(file_name.to_string()),
        },
    )
}

/// A button press on `message_id`.
pub(crate) fn callback(
    user_id: UserId,
    message_id: MessageId,
    data: &str,
    sent_at: DateTime<Utc>,
) -> InboundEvent {
    event(
        user_id,
        message_id,
        EventKind::Callback {
            id: format!("cb-{}", message_id),
            data: data.to_string(),
            sent_at,
        },
    )
}
