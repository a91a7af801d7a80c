//! Database models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Chat-scoped user identifier.
pub type UserId = i64;
/// Chat identifier used to address outbound messages.
pub type ChatId = i64;
/// Storage-assigned activity identifier.
pub type ActivityId = i64;
/// Chat message identifier.
pub type MessageId = i64;

/// Parent id of a top-level activity.
pub const ROOT_PARENT_ID: ActivityId = -1;

/// A bot user and their notification schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Chat-scoped user id.
    pub id: UserId,
    /// Chat the prompts are delivered to.
    pub chat_id: ChatId,
    /// Whether the scheduler should prompt this user.
    pub notifications_enabled: bool,
    /// Minutes between prompts.
    pub interval_minutes: Option<i64>,
    /// First hour (UTC, inclusive) of the daily prompt window.
    pub morning_start_hour: Option<u32>,
    /// Last hour (UTC, exclusive) of the daily prompt window.
    pub evening_finish_hour: Option<u32>,
    /// When the last prompt was dispatched.
    pub last_notify: Option<DateTime<Utc>>,
}

impl User {
    /// A fresh user with notifications disabled and no schedule.
    pub fn new(id: UserId, chat_id: ChatId) -> Self {
        Self {
            id,
            chat_id,
            notifications_enabled: false,
            interval_minutes: None,
            morning_start_hour: None,
            evening_finish_hour: None,
            last_notify: None,
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for User {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            notifications_enabled: row.try_get("notifications_enabled")?,
            interval_minutes: row.try_get("interval_minutes")?,
            morning_start_hour: decode_hour(row, "morning_start_hour")?,
            evening_finish_hour: decode_hour(row, "evening_finish_hour")?,
            last_notify: row
                .try_get::<Option<i64>, _>("last_notify")?
                .map(|secs| decode_timestamp(secs, "last_notify"))
                .transpose()?,
        })
    }
}

/// A node in a user's activity forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Activity {
    /// Auto-incrementing ID.
    pub id: ActivityId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name (one path segment).
    pub name: String,
    /// Parent activity, or [`ROOT_PARENT_ID`].
    pub parent_id: ActivityId,
    /// Set when the node was created as the last segment of a path.
    pub is_leaf: bool,
    /// Excluded from routine prompts.
    pub muted: bool,
    /// Some leaf in this subtree is muted.
    pub has_muted_leaves: bool,
}

/// Fields for a new activity row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub user_id: UserId,
    pub name: String,
    pub parent_id: ActivityId,
    pub is_leaf: bool,
    pub muted: bool,
}

/// Row filter for activity listings.
///
/// Unset fields are ignored. When both are set a row matches if it satisfies
/// either of them, which is what the unmute picker needs
/// (`muted OR has_muted_leaves`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub muted: Option<bool>,
    pub has_muted_leaves: Option<bool>,
}

impl ActivityFilter {
    /// Every activity of the user.
    pub fn all() -> Self {
        Self::default()
    }

    /// Activities that are not muted.
    pub fn unmuted() -> Self {
        Self {
            muted: Some(false),
            has_muted_leaves: None,
        }
    }

    /// Activities that are muted or hide a muted leaf.
    pub fn muted_or_hiding_muted() -> Self {
        Self {
            muted: Some(true),
            has_muted_leaves: Some(true),
        }
    }
}

/// Time attributed to a leaf activity in answer to one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// Prompt message the answer belongs to.
    pub message_id: MessageId,
    pub user_id: UserId,
    pub activity_id: ActivityId,
    /// When the prompt was sent.
    pub timestamp: DateTime<Utc>,
    /// Minutes attributed to the activity.
    pub interval_minutes: i64,
}

impl<'r> FromRow<'r, SqliteRow> for ActivityLogEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            message_id: row.try_get("message_id")?,
            user_id: row.try_get("user_id")?,
            activity_id: row.try_get("activity_id")?,
            timestamp: decode_timestamp(row.try_get("timestamp")?, "timestamp")?,
            interval_minutes: row.try_get("interval_minutes")?,
        })
    }
}

fn decode_hour(row: &SqliteRow, column: &str) -> Result<Option<u32>, sqlx::Error> {
    row.try_get::<Option<i64>, _>(column)?
        .map(|hour| {
            u32::try_from(hour).map_err(|e| sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: Box::new(e),
            })
        })
        .transpose()
}

fn decode_timestamp(secs: i64, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("timestamp out of range: {}", secs).into(),
    })
}
