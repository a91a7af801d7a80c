//! Activity CRUD operations and subtree queries.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Activity, ActivityFilter, ActivityId, NewActivity, UserId, ROOT_PARENT_ID};

/// Insert a new activity and return its id.
///
/// A non-root parent must be one of the same user's activities.
pub async fn create_activity(pool: &SqlitePool, activity: &NewActivity) -> Result<ActivityId> {
    if activity.parent_id != ROOT_PARENT_ID {
        let owned: Option<i64> =
            sqlx::query_scalar("SELECT id FROM activities WHERE id = ? AND user_id = ?")
                .bind(activity.parent_id)
                .bind(activity.user_id)
                .fetch_optional(pool)
                .await?;
        if owned.is_none() {
            return Err(DatabaseError::ForeignParent {
                user_id: activity.user_id,
                parent_id: activity.parent_id,
            });
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO activities (user_id, name, parent_id, is_leaf, muted, has_muted_leaves)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(activity.user_id)
    .bind(&activity.name)
    .bind(activity.parent_id)
    .bind(activity.is_leaf)
    .bind(activity.muted)
    .bind(activity.is_leaf && activity.muted)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get one of the user's activities by id.
pub async fn get_activity(pool: &SqlitePool, user_id: UserId, id: ActivityId) -> Result<Activity> {
    sqlx::query_as::<_, Activity>(
        r#"
        SELECT id, user_id, name, parent_id, is_leaf, muted, has_muted_leaves
        FROM activities
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Activity", id))
}

/// Find an activity by its exact (name, parent, leaf flag) triple.
pub async fn find_activity(
    pool: &SqlitePool,
    user_id: UserId,
    name: &str,
    parent_id: ActivityId,
    is_leaf: bool,
) -> Result<Option<Activity>> {
    let activity = sqlx::query_as::<_, Activity>(
        r#"
        SELECT id, user_id, name, parent_id, is_leaf, muted, has_muted_leaves
        FROM activities
        WHERE user_id = ? AND name = ? AND parent_id = ? AND is_leaf = ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(parent_id)
    .bind(is_leaf)
    .fetch_optional(pool)
    .await?;

    Ok(activity)
}

/// List the user's activities that pass `filter`.
pub async fn list_activities(
    pool: &SqlitePool,
    user_id: UserId,
    filter: ActivityFilter,
) -> Result<Vec<Activity>> {
    let any_filter = filter.muted.is_some() || filter.has_muted_leaves.is_some();
    let activities = sqlx::query_as::<_, Activity>(
        r#"
        SELECT id, user_id, name, parent_id, is_leaf, muted, has_muted_leaves
        FROM activities
        WHERE user_id = ?
          AND (? = 0 OR muted = ? OR has_muted_leaves = ?)
        ORDER BY id
        "#,
    )
    .bind(user_id)
    .bind(any_filter)
    .bind(filter.muted)
    .bind(filter.has_muted_leaves)
    .fetch_all(pool)
    .await?;

    Ok(activities)
}

/// Set the muted flag of an activity.
pub async fn set_muted(pool: &SqlitePool, id: ActivityId, muted: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE activities
        SET muted = ?
        WHERE id = ?
        "#,
    )
    .bind(muted)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Activity", id));
    }

    Ok(())
}

/// Store the has-muted-leaves flag of an activity.
pub async fn set_has_muted_leaves(pool: &SqlitePool, id: ActivityId, value: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE activities
        SET has_muted_leaves = ?
        WHERE id = ?
        "#,
    )
    .bind(value)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Activity", id));
    }

    Ok(())
}

/// Count direct children of `parent_id`, optionally only those with the given muted flag.
pub async fn count_children(
    pool: &SqlitePool,
    parent_id: ActivityId,
    muted: Option<bool>,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM activities
        WHERE parent_id = ?
          AND (? IS NULL OR muted = ?)
        "#,
    )
    .bind(parent_id)
    .bind(muted)
    .bind(muted)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Whether any leaf in the subtree rooted at `id` (inclusive) is muted.
pub async fn has_muted_leaf_in_subtree(pool: &SqlitePool, id: ActivityId) -> Result<bool> {
    let found = sqlx::query_scalar::<_, bool>(
        r#"
        WITH RECURSIVE subtree(id) AS (
            SELECT id FROM activities WHERE id = ?
            UNION ALL
            SELECT a.id FROM activities a
            JOIN subtree s ON a.parent_id = s.id
        )
        SELECT EXISTS(
            SELECT 1 FROM activities
            WHERE id IN (SELECT id FROM subtree)
              AND is_leaf = 1
              AND muted = 1
        )
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(found)
}

/// Delete an activity, all of its descendants and every log entry that
/// references any of them, in one transaction.
///
/// Returns the ids that were removed.
pub async fn delete_subtree(
    pool: &SqlitePool,
    user_id: UserId,
    id: ActivityId,
) -> Result<Vec<ActivityId>> {
    let mut tx = pool.begin().await?;

    let ids = sqlx::query_scalar::<_, ActivityId>(
        r#"
        WITH RECURSIVE subtree(id) AS (
            SELECT id FROM activities WHERE id = ? AND user_id = ?
            UNION ALL
            SELECT a.id FROM activities a
            JOIN subtree s ON a.parent_id = s.id
        )
        SELECT id FROM subtree
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    if ids.is_empty() {
        return Err(DatabaseError::not_found("Activity", id));
    }

    for activity_id in &ids {
        sqlx::query("DELETE FROM activity_log WHERE activity_id = ? AND user_id = ?")
            .bind(activity_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM activities WHERE id = ?")
            .bind(activity_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::debug!(user_id, root = id, removed = ids.len(), "Deleted activity subtree");
    Ok(ids)
}
