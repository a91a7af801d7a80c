//! Activity log storage and duration sums.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{ActivityId, ActivityLogEntry, UserId};

/// Record an answer to a prompt.
///
/// A second answer to the same (message, user) pair replaces the activity of
/// the existing row instead of adding a new one.
pub async fn upsert_log(pool: &SqlitePool, entry: &ActivityLogEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO activity_log (message_id, user_id, activity_id, timestamp, interval_minutes)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(message_id, user_id) DO UPDATE SET
            activity_id = excluded.activity_id
        "#,
    )
    .bind(entry.message_id)
    .bind(entry.user_id)
    .bind(entry.activity_id)
    .bind(entry.timestamp.timestamp())
    .bind(entry.interval_minutes)
    .execute(pool)
    .await?;

    Ok(())
}

/// Total logged minutes per activity for entries with `start <= timestamp < end`.
pub async fn sum_minutes_by_activity(
    pool: &SqlitePool,
    user_id: UserId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<HashMap<ActivityId, i64>> {
    let rows = sqlx::query_as::<_, (ActivityId, i64)>(
        r#"
        SELECT activity_id, COALESCE(SUM(interval_minutes), 0)
        FROM activity_log
        WHERE user_id = ?
          AND timestamp >= ?
          AND timestamp < ?
        GROUP BY activity_id
        "#,
    )
    .bind(user_id)
    .bind(start.timestamp())
    .bind(end.timestamp())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

/// List the user's log entries, newest first.
pub async fn list_logs(pool: &SqlitePool, user_id: UserId) -> Result<Vec<ActivityLogEntry>> {
    let entries = sqlx::query_as::<_, ActivityLogEntry>(
        r#"
        SELECT message_id, user_id, activity_id, timestamp, interval_minutes
        FROM activity_log
        WHERE user_id = ?
        ORDER BY timestamp DESC, message_id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Count log entries that reference an activity.
pub async fn count_logs_for_activity(pool: &SqlitePool, activity_id: ActivityId) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM activity_log WHERE activity_id = ?
        "#,
    )
    .bind(activity_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
