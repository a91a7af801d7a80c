//! Activity tree engine.
//!
//! Activities form a forest per user, stored as flat rows linked by
//! `parent_id`. Reads load the rows once and index them by parent; writes go
//! straight to storage one row at a time.

use std::collections::{HashMap, HashSet};

use database::activity;
use database::activity_log;
use database::{Activity, ActivityFilter, ActivityId, ActivityLogEntry, NewActivity, UserId, ROOT_PARENT_ID};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{Result, TrackerError};

/// Separator between path segments, both for input and for route names.
pub const PATH_SEPARATOR: &str = " / ";

/// A leaf together with its full path name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRoute {
    pub name: String,
    pub leaf_id: ActivityId,
}

/// In-memory adjacency index over a user's activity rows.
#[derive(Debug, Clone, Default)]
pub struct ActivityForest {
    nodes: HashMap<ActivityId, Activity>,
    children: HashMap<ActivityId, Vec<ActivityId>>,
}

impl ActivityForest {
    pub fn new(activities: impl IntoIterator<Item = Activity>) -> Self {
        let mut nodes = HashMap::new();
        let mut children: HashMap<ActivityId, Vec<ActivityId>> = HashMap::new();
        for activity in activities {
            children.entry(activity.parent_id).or_default().push(activity.id);
            nodes.insert(activity.id, activity);
        }
        for ids in children.values_mut() {
            ids.sort_unstable();
        }
        Self { nodes, children }
    }

    /// Load the user's activities that pass `filter`.
    pub async fn load(pool: &SqlitePool, user_id: UserId, filter: ActivityFilter) -> Result<Self> {
        let activities = activity::list_activities(pool, user_id, filter).await?;
        Ok(Self::new(activities))
    }

    pub fn get(&self, id: ActivityId) -> Option<&Activity> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of `parent_id`, ordered by id.
    pub fn children(&self, parent_id: ActivityId) -> impl Iterator<Item = &Activity> + '_ {
        self.children
            .get(&parent_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.nodes.get(id))
    }

    /// Top-level activities.
    pub fn roots(&self) -> impl Iterator<Item = &Activity> + '_ {
        self.children(ROOT_PARENT_ID)
    }

    /// One route per reachable leaf, found depth-first from every root.
    ///
    /// Descent stops at leaves even if rows were later attached below them.
    pub fn routes(&self) -> Vec<ActivityRoute> {
        let mut routes = Vec::new();
        let mut stack = Vec::new();
        for root in self.roots() {
            self.walk(root, &mut stack, &mut routes);
        }
        routes
    }

    fn walk<'a>(
        &'a self,
        node: &'a Activity,
        stack: &mut Vec<&'a str>,
        routes: &mut Vec<ActivityRoute>,
    ) {
        if node.is_leaf {
            let mut segments = stack.clone();
            segments.push(&node.name);
            routes.push(ActivityRoute {
                name: segments.join(PATH_SEPARATOR),
                leaf_id: node.id,
            });
            return;
        }

        stack.push(&node.name);
        for child in self.children(node.id) {
            self.walk(child, stack, routes);
        }
        stack.pop();
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn lineage(&self, id: ActivityId) -> Vec<ActivityId> {
        let mut lineage = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.nodes.get(&id);
        while let Some(node) = current {
            // Stop on malformed parent chains.
            if !seen.insert(node.id) {
                break;
            }
            lineage.push(node.id);
            current = self.nodes.get(&node.parent_id);
        }
        lineage.reverse();
        lineage
    }

    /// `"A / B / C"` name of any node, or `None` if it is not in the forest.
    pub fn full_name(&self, id: ActivityId) -> Option<String> {
        self.nodes.get(&id)?;
        let names: Vec<&str> = self
            .lineage(id)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).map(|node| node.name.as_str()))
            .collect();
        Some(names.join(PATH_SEPARATOR))
    }

    /// Ids of `id` and all of its descendants.
    pub fn subtree(&self, id: ActivityId) -> Vec<ActivityId> {
        let mut ids = Vec::new();
        let mut pending = vec![id];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if !self.nodes.contains_key(&current) || !seen.insert(current) {
                continue;
            }
            ids.push(current);
            if let Some(children) = self.children.get(&current) {
                pending.extend(children.iter().rev());
            }
        }
        ids
    }

    /// The has-muted-leaves value every node should store: true iff a muted
    /// leaf sits in its subtree, itself included.
    pub fn muted_leaf_flags(&self) -> HashMap<ActivityId, bool> {
        let mut flags: HashMap<ActivityId, bool> =
            self.nodes.keys().map(|id| (*id, false)).collect();
        for node in self.nodes.values().filter(|node| node.is_leaf && node.muted) {
            for id in self.lineage(node.id) {
                flags.insert(id, true);
            }
        }
        flags
    }
}

/// Split `"A / B / C"` into trimmed, non-empty segments.
pub fn parse_path(path: &str) -> Result<Vec<&str>> {
    let path = path.trim();
    if path.is_empty() {
        return Err(TrackerError::validation("Activity name can't be empty."));
    }

    let segments: Vec<&str> = path.split(PATH_SEPARATOR).map(str::trim).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(TrackerError::validation(format!(
            "\"{}\" has an empty part. Separate levels with \"{}\", e.g. Work / Coding.",
            path, PATH_SEPARATOR
        )));
    }
    Ok(segments)
}

/// Insert a path, reusing every segment that already exists.
///
/// A segment matches an existing row on (name, parent, leaf flag), where the
/// leaf flag is set only for the last segment. Returns the leaf id.
pub async fn parse_and_add_activity(
    pool: &SqlitePool,
    user_id: UserId,
    path: &str,
) -> Result<ActivityId> {
    let segments = parse_path(path)?;
    let last = segments.len() - 1;

    let mut parent_id = ROOT_PARENT_ID;
    let mut muted_ancestors = Vec::new();
    let mut created_leaf = false;

    for (index, segment) in segments.iter().enumerate() {
        let is_leaf = index == last;
        parent_id = match activity::find_activity(pool, user_id, segment, parent_id, is_leaf).await? {
            Some(existing) => {
                if existing.muted && !is_leaf {
                    muted_ancestors.push(existing.id);
                }
                existing.id
            }
            None => {
                let id = activity::create_activity(
                    pool,
                    &NewActivity {
                        user_id,
                        name: segment.to_string(),
                        parent_id,
                        is_leaf,
                        muted: false,
                    },
                )
                .await?;
                debug!(user_id, activity_id = id, name = %segment, is_leaf, "Created activity");
                created_leaf = is_leaf;
                id
            }
        };
    }

    // A fresh unmuted leaf means its ancestors are no longer fully muted.
    if created_leaf {
        for id in muted_ancestors {
            activity::set_muted(pool, id, false).await?;
        }
    }

    Ok(parent_id)
}

/// All routes of the user's forest.
pub async fn full_activities(pool: &SqlitePool, user_id: UserId) -> Result<Vec<ActivityRoute>> {
    let forest = ActivityForest::load(pool, user_id, ActivityFilter::all()).await?;
    Ok(forest.routes())
}

/// Full path name of one of the user's activities.
pub async fn full_activity_name(pool: &SqlitePool, user_id: UserId, id: ActivityId) -> Result<String> {
    let forest = ActivityForest::load(pool, user_id, ActivityFilter::all()).await?;
    forest
        .full_name(id)
        .ok_or_else(|| TrackerError::not_found("Activity", id))
}

/// Record an answer to a prompt. Only leaves can be logged.
pub async fn log_activity(pool: &SqlitePool, entry: &ActivityLogEntry) -> Result<()> {
    let target = activity::get_activity(pool, entry.user_id, entry.activity_id).await?;
    if !target.is_leaf {
        return Err(TrackerError::validation(format!(
            "\"{}\" has sub-activities, pick one of them.",
            target.name
        )));
    }
    activity_log::upsert_log(pool, entry).await?;
    Ok(())
}

/// Mute a leaf and every ancestor left without an unmuted child.
///
/// The upward mute stops at the first ancestor that still has an unmuted
/// child; has-muted-leaves is recomputed on every ancestor up to the root.
/// Returns the ids whose muted flag was set.
pub async fn mute_activity(pool: &SqlitePool, user_id: UserId, id: ActivityId) -> Result<Vec<ActivityId>> {
    let target = activity::get_activity(pool, user_id, id).await?;
    if !target.is_leaf {
        return Err(TrackerError::validation(format!(
            "\"{}\" has sub-activities, mute them one by one.",
            target.name
        )));
    }

    activity::set_muted(pool, id, true).await?;
    activity::set_has_muted_leaves(pool, id, true).await?;
    let mut muted = vec![id];

    let mut propagating = true;
    let mut seen = HashSet::from([id]);
    let mut parent_id = target.parent_id;
    while parent_id != ROOT_PARENT_ID && seen.insert(parent_id) {
        let parent = activity::get_activity(pool, user_id, parent_id).await?;

        if propagating {
            let unmuted_children = activity::count_children(pool, parent.id, Some(false)).await?;
            if unmuted_children == 0 {
                if !parent.muted {
                    activity::set_muted(pool, parent.id, true).await?;
                    muted.push(parent.id);
                }
            } else {
                propagating = false;
            }
        }

        refresh_muted_leaf_flag(pool, &parent).await?;
        parent_id = parent.parent_id;
    }

    debug!(user_id, activity_id = id, muted = muted.len(), "Muted activity");
    Ok(muted)
}

/// Unmute an activity and every ancestor up to the root.
///
/// Returns the ids whose muted flag was cleared.
pub async fn unmute_activity(pool: &SqlitePool, user_id: UserId, id: ActivityId) -> Result<Vec<ActivityId>> {
    let target = activity::get_activity(pool, user_id, id).await?;

    let mut unmuted = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(target);
    while let Some(node) = current {
        if !seen.insert(node.id) {
            warn!(user_id, activity_id = node.id, "Cycle in activity parents");
            break;
        }
        if node.muted {
            activity::set_muted(pool, node.id, false).await?;
            unmuted.push(node.id);
        }
        refresh_muted_leaf_flag(pool, &node).await?;

        current = if node.parent_id == ROOT_PARENT_ID {
            None
        } else {
            Some(activity::get_activity(pool, user_id, node.parent_id).await?)
        };
    }

    debug!(user_id, activity_id = id, unmuted = unmuted.len(), "Unmuted activity");
    Ok(unmuted)
}

/// Delete an activity with its subtree and every log entry that references
/// the removed rows, then refresh the ancestors' has-muted-leaves flags.
pub async fn delete_activity_recursive(
    pool: &SqlitePool,
    user_id: UserId,
    id: ActivityId,
) -> Result<Vec<ActivityId>> {
    let target = activity::get_activity(pool, user_id, id).await?;
    let removed = activity::delete_subtree(pool, user_id, id).await?;

    let mut seen = HashSet::new();
    let mut parent_id = target.parent_id;
    while parent_id != ROOT_PARENT_ID && seen.insert(parent_id) {
        let parent = activity::get_activity(pool, user_id, parent_id).await?;
        refresh_muted_leaf_flag(pool, &parent).await?;
        parent_id = parent.parent_id;
    }

    Ok(removed)
}

/// Bring every stored has-muted-leaves flag of the user in line with the
/// tree. Returns the number of rows changed.
pub async fn recompute_muted_leaf_flags(pool: &SqlitePool, user_id: UserId) -> Result<usize> {
    let forest = ActivityForest::load(pool, user_id, ActivityFilter::all()).await?;
    let mut changed = 0;
    for (id, expected) in forest.muted_leaf_flags() {
        let stored = forest.get(id).map(|node| node.has_muted_leaves);
        if stored != Some(expected) {
            activity::set_has_muted_leaves(pool, id, expected).await?;
            changed += 1;
        }
    }
    Ok(changed)
}

async fn refresh_muted_leaf_flag(pool: &SqlitePool, node: &Activity) -> Result<()> {
    let has_muted = activity::has_muted_leaf_in_subtree(pool, node.id).await?;
    if has_muted != node.has_muted_leaves {
        activity::set_has_muted_leaves(pool, node.id, has_muted).await?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use chrono::{TimeZone, Utc};
    use database::Database;

    use super::*;

    pub(crate) async fn test_db() -> Database {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn node(id: ActivityId, parent_id: ActivityId, name: &str, is_leaf: bool) -> Activity {
        Activity {
            id,
            user_id: 1,
            name: name.to_string(),
            parent_id,
            is_leaf,
            muted: false,
            has_muted_leaves: false,
        }
    }

    async fn by_name(pool: &SqlitePool, user_id: UserId, name: &str) -> Activity {
        activity::list_activities(pool, user_id, ActivityFilter::all())
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.name == name)
            .unwrap_or_else(|| panic!("no activity named {}", name))
    }

    async fn assert_flags_match_query(pool: &SqlitePool, user_id: UserId) {
        for a in activity::list_activities(pool, user_id, ActivityFilter::all())
            .await
            .unwrap()
        {
            let expected = activity::has_muted_leaf_in_subtree(pool, a.id).await.unwrap();
            assert_eq!(a.has_muted_leaves, expected, "stale flag on {}", a.name);
        }
    }

    #[test]
    fn test_routes_depth_first() {
        let forest = ActivityForest::new(vec![
            node(1, ROOT_PARENT_ID, "Work", false),
            node(2, 1, "Coding", false),
            node(3, 2, "Rust", true),
            node(4, 1, "Meetings", true),
            node(5, ROOT_PARENT_ID, "Sleep", true),
            // Attached below a leaf: never reached.
            node(6, 5, "Nap", true),
        ]);

        let routes = forest.routes();
        let names: BTreeSet<_> = routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            BTreeSet::from(["Work / Coding / Rust", "Work / Meetings", "Sleep"])
        );
        assert!(routes.iter().any(|r| r.name == "Sleep" && r.leaf_id == 5));
    }

    #[test]
    fn test_full_name_and_subtree() {
        let forest = ActivityForest::new(vec![
            node(1, ROOT_PARENT_ID, "Work", false),
            node(2, 1, "Coding", false),
            node(3, 2, "Rust", true),
            node(4, 1, "Meetings", true),
        ]);
        assert_eq!(forest.full_name(3).as_deref(), Some("Work / Coding / Rust"));
        assert_eq!(forest.full_name(1).as_deref(), Some("Work"));
        assert_eq!(forest.full_name(99), None);
        assert_eq!(forest.lineage(3), vec![1, 2, 3]);

        let mut subtree = forest.subtree(1);
        subtree.sort_unstable();
        assert_eq!(subtree, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_muted_leaf_flags_in_memory() {
        let mut muted_leaf = node(3, 2, "Rust", true);
        muted_leaf.muted = true;
        let forest = ActivityForest::new(vec![
            node(1, ROOT_PARENT_ID, "Work", false),
            node(2, 1, "Coding", false),
            muted_leaf,
            node(4, 1, "Meetings", true),
        ]);
        let flags = forest.muted_leaf_flags();
        assert!(flags[&1] && flags[&2] && flags[&3]);
        assert!(!flags[&4]);
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path(" Work / Coding ").unwrap(), vec!["Work", "Coding"]);
        assert_eq!(parse_path("Sleep").unwrap(), vec!["Sleep"]);
        assert!(matches!(parse_path("  "), Err(TrackerError::Validation(_))));
        assert!(matches!(parse_path("Work /  / Coding"), Err(TrackerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let db = test_db().await;
        let pool = db.pool();

        let first = parse_and_add_activity(pool, 1, "Work / Coding / Rust").await.unwrap();
        let second = parse_and_add_activity(pool, 1, "Work / Coding / Rust").await.unwrap();
        assert_eq!(first, second);

        let all = activity::list_activities(pool, 1, ActivityFilter::all()).await.unwrap();
        assert_eq!(all.len(), 3);

        // Sharing a prefix reuses it.
        parse_and_add_activity(pool, 1, "Work / Coding / Go").await.unwrap();
        let all = activity::list_activities(pool, 1, ActivityFilter::all()).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_routes_reproduce_inserted_paths() {
        let db = test_db().await;
        let pool = db.pool();
        let paths = [
            "Work / Coding / Rust",
            "Work / Coding / Review",
            "Work / Meetings",
            "Sleep",
            "Home / Chores / Laundry",
        ];
        for path in paths {
            parse_and_add_activity(pool, 1, path).await.unwrap();
        }
        // Another user's tree stays separate.
        parse_and_add_activity(pool, 2, "Work / Other").await.unwrap();

        let routes = full_activities(pool, 1).await.unwrap();
        assert_eq!(routes.len(), paths.len());
        let names: BTreeSet<_> = routes.into_iter().map(|r| r.name).collect();
        let expected: BTreeSet<_> = paths.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_stored_leaf_flag_keeps_leaf_and_branch_apart() {
        let db = test_db().await;
        let pool = db.pool();

        parse_and_add_activity(pool, 1, "Reading").await.unwrap();
        parse_and_add_activity(pool, 1, "Reading / Books").await.unwrap();

        let routes = full_activities(pool, 1).await.unwrap();
        let names: BTreeSet<_> = routes.into_iter().map(|r| r.name).collect();
        assert_eq!(names, BTreeSet::from(["Reading".to_string(), "Reading / Books".to_string()]));
    }

    #[tokio::test]
    async fn test_mute_propagates_until_unmuted_sibling() {
        let db = test_db().await;
        let pool = db.pool();
        parse_and_add_activity(pool, 1, "Work / Coding / Rust").await.unwrap();
        parse_and_add_activity(pool, 1, "Work / Meetings").await.unwrap();

        let rust = by_name(pool, 1, "Rust").await;
        let muted = mute_activity(pool, 1, rust.id).await.unwrap();

        let coding = by_name(pool, 1, "Coding").await;
        let work = by_name(pool, 1, "Work").await;
        assert_eq!(muted, vec![rust.id, coding.id]);
        assert!(coding.muted);
        assert!(!work.muted, "Work still has unmuted Meetings");
        assert!(work.has_muted_leaves);
        assert_flags_match_query(pool, 1).await;

        let meetings = by_name(pool, 1, "Meetings").await;
        mute_activity(pool, 1, meetings.id).await.unwrap();
        assert!(by_name(pool, 1, "Work").await.muted);
        assert_flags_match_query(pool, 1).await;
    }

    #[tokio::test]
    async fn test_mute_rejects_non_leaf() {
        let db = test_db().await;
        let pool = db.pool();
        parse_and_add_activity(pool, 1, "Work / Coding").await.unwrap();

        let work = by_name(pool, 1, "Work").await;
        let result = mute_activity(pool, 1, work.id).await;
        assert!(matches!(result, Err(TrackerError::Validation(_))));
        assert!(!by_name(pool, 1, "Work").await.muted);
    }

    #[tokio::test]
    async fn test_unmute_clears_every_ancestor() {
        let db = test_db().await;
        let pool = db.pool();
        parse_and_add_activity(pool, 1, "Work / Coding / Rust").await.unwrap();
        parse_and_add_activity(pool, 1, "Work / Coding / Go").await.unwrap();

        let rust = by_name(pool, 1, "Rust").await;
        let go = by_name(pool, 1, "Go").await;
        mute_activity(pool, 1, rust.id).await.unwrap();
        mute_activity(pool, 1, go.id).await.unwrap();
        assert!(by_name(pool, 1, "Work").await.muted);

        let unmuted = unmute_activity(pool, 1, go.id).await.unwrap();
        assert_eq!(unmuted.len(), 3);
        let coding = by_name(pool, 1, "Coding").await;
        let work = by_name(pool, 1, "Work").await;
        assert!(!coding.muted && !work.muted);
        // Rust is still muted, so the flag stays on.
        assert!(coding.has_muted_leaves && work.has_muted_leaves);
        assert_flags_match_query(pool, 1).await;

        unmute_activity(pool, 1, rust.id).await.unwrap();
        assert!(!by_name(pool, 1, "Work").await.has_muted_leaves);
        assert_flags_match_query(pool, 1).await;
    }

    #[tokio::test]
    async fn test_new_leaf_unmutes_fully_muted_branch() {
        let db = test_db().await;
        let pool = db.pool();
        parse_and_add_activity(pool, 1, "Work / Coding").await.unwrap();
        let coding = by_name(pool, 1, "Coding").await;
        mute_activity(pool, 1, coding.id).await.unwrap();
        assert!(by_name(pool, 1, "Work").await.muted);

        parse_and_add_activity(pool, 1, "Work / Writing").await.unwrap();
        assert!(!by_name(pool, 1, "Work").await.muted);
        assert!(by_name(pool, 1, "Coding").await.muted);
    }

    #[tokio::test]
    async fn test_delete_removes_subtree_and_logs() {
        let db = test_db().await;
        let pool = db.pool();
        parse_and_add_activity(pool, 1, "Work / Coding / Rust").await.unwrap();
        parse_and_add_activity(pool, 1, "Work / Meetings").await.unwrap();
        let rust = by_name(pool, 1, "Rust").await;
        let meetings = by_name(pool, 1, "Meetings").await;
        mute_activity(pool, 1, rust.id).await.unwrap();

        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        for (message_id, activity_id) in [(10, rust.id), (11, meetings.id)] {
            log_activity(
                pool,
                &ActivityLogEntry {
                    message_id,
                    user_id: 1,
                    activity_id,
                    timestamp: at,
                    interval_minutes: 30,
                },
            )
            .await
            .unwrap();
        }

        let coding = by_name(pool, 1, "Coding").await;
        let removed = delete_activity_recursive(pool, 1, coding.id).await.unwrap();
        assert_eq!(removed.len(), 2);

        assert!(matches!(
            activity::get_activity(pool, 1, rust.id).await,
            Err(database::DatabaseError::NotFound { .. })
        ));
        assert_eq!(activity_log::count_logs_for_activity(pool, rust.id).await.unwrap(), 0);
        assert_eq!(activity_log::count_logs_for_activity(pool, meetings.id).await.unwrap(), 1);
        assert!(!by_name(pool, 1, "Work").await.has_muted_leaves);

        let again = delete_activity_recursive(pool, 1, coding.id).await;
        assert!(matches!(again, Err(TrackerError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_checks_owner() {
        let db = test_db().await;
        let pool = db.pool();
        let id = parse_and_add_activity(pool, 1, "Sleep").await.unwrap();

        let result = delete_activity_recursive(pool, 2, id).await;
        assert!(matches!(result, Err(TrackerError::NotFound { .. })));
        assert!(activity::get_activity(pool, 1, id).await.is_ok());
    }

    #[tokio::test]
    async fn test_log_rejects_non_leaf() {
        let db = test_db().await;
        let pool = db.pool();
        parse_and_add_activity(pool, 1, "Work / Coding").await.unwrap();
        let work = by_name(pool, 1, "Work").await;

        let result = log_activity(
            pool,
            &ActivityLogEntry {
                message_id: 1,
                user_id: 1,
                activity_id: work.id,
                timestamp: Utc::now(),
                interval_minutes: 20,
            },
        )
        .await;
        assert!(matches!(result, Err(TrackerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_recompute_flags() {
        let db = test_db().await;
        let pool = db.pool();
        let leaf = parse_and_add_activity(pool, 1, "Work / Coding").await.unwrap();
        activity::set_muted(pool, leaf, true).await.unwrap();

        let changed = recompute_muted_leaf_flags(pool, 1).await.unwrap();
        assert_eq!(changed, 2);
        assert_flags_match_query(pool, 1).await;
        assert_eq!(recompute_muted_leaf_flags(pool, 1).await.unwrap(), 0);
    }
}
