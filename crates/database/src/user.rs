//! User CRUD operations.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{ChatId, User, UserId};

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: UserId) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, chat_id, notifications_enabled, interval_minutes,
               morning_start_hour, evening_finish_hour, last_notify
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("User", id))
}

/// Create the user on first contact and return the stored row.
///
/// Existing users are left untouched, so this is safe to call for every
/// inbound event.
pub async fn ensure_user(pool: &SqlitePool, id: UserId, chat_id: ChatId) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (id, chat_id, notifications_enabled)
        VALUES (?, ?, 0)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(chat_id)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!(user_id = id, "Registered new user");
    }

    get_user(pool, id).await
}

/// Update an existing user.
pub async fn update_user(pool: &SqlitePool, user: &User) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET chat_id = ?, notifications_enabled = ?, interval_minutes = ?,
            morning_start_hour = ?, evening_finish_hour = ?, last_notify = ?
        WHERE id = ?
        "#,
    )
    .bind(user.chat_id)
    .bind(user.notifications_enabled)
    .bind(user.interval_minutes)
    .bind(user.morning_start_hour)
    .bind(user.evening_finish_hour)
    .bind(user.last_notify.map(|t| t.timestamp()))
    .bind(user.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", user.id));
    }

    Ok(())
}

/// Record when the last prompt was dispatched.
pub async fn set_last_notify(pool: &SqlitePool, id: UserId, at: DateTime<Utc>) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET last_notify = ?
        WHERE id = ?
        "#,
    )
    .bind(at.timestamp())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    Ok(())
}

/// List all users.
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, chat_id, notifications_enabled, interval_minutes,
               morning_start_hour, evening_finish_hour, last_notify
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}
