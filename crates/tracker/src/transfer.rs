//! YAML export and import of activity trees.

use chrono::{DateTime, Utc};
use database::activity;
use database::{ActivityFilter, ActivityId, NewActivity, UserId, ROOT_PARENT_ID};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{Result, TrackerError};
use crate::tree::{self, ActivityForest, PATH_SEPARATOR};

/// Document format version written and accepted.
pub const EXPORT_VERSION: &str = "1.0";

const SUPPORTED_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];

/// Top level of an exported file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: String,
    pub user_id: UserId,
    pub export_date: DateTime<Utc>,
    #[serde(default)]
    pub activities: Vec<ExportNode>,
}

/// One activity and its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNode {
    pub name: String,
    #[serde(default)]
    pub muted: bool,
    /// Stored leaf flag. Hand-written files may omit it, in which case a
    /// node without children is a leaf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_leaf: Option<bool>,
    #[serde(default)]
    pub children: Vec<ExportNode>,
}

impl ExportNode {
    pub fn leaf_flag(&self) -> bool {
        self.is_leaf.unwrap_or(self.children.is_empty())
    }
}

/// What an import changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    /// Existing activities whose muted flag changed.
    pub updated: usize,
    pub unchanged: usize,
}

/// Nest the forest under the root sentinel.
pub fn build_export(forest: &ActivityForest, user_id: UserId, now: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        version: EXPORT_VERSION.to_string(),
        user_id,
        export_date: now,
        activities: export_children(forest, ROOT_PARENT_ID),
    }
}

fn export_children(forest: &ActivityForest, parent_id: ActivityId) -> Vec<ExportNode> {
    forest
        .children(parent_id)
        .map(|activity| ExportNode {
            name: activity.name.clone(),
            muted: activity.muted,
            is_leaf: Some(activity.is_leaf),
            children: if activity.is_leaf {
                Vec::new()
            } else {
                export_children(forest, activity.id)
            },
        })
        .collect()
}

/// Serialize the user's tree. Returns the file name and its contents.
pub async fn export_activities(
    pool: &SqlitePool,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<(String, Vec<u8>)> {
    let forest = ActivityForest::load(pool, user_id, ActivityFilter::all()).await?;
    let document = build_export(&forest, user_id, now);
    let yaml = serde_yaml::to_string(&document)
        .map_err(|e| TrackerError::validation(format!("Couldn't write the export: {}", e)))?;

    debug!(user_id, activities = forest.len(), "Exported activities");
    Ok((format!("activities_export_{}.yaml", user_id), yaml.into_bytes()))
}

/// Whether an uploaded file name looks like an export.
pub fn is_supported_file(file_name: Option<&str>) -> bool {
    file_name
        .map(str::to_ascii_lowercase)
        .is_some_and(|name| SUPPORTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
}

/// Parse and validate a document without touching storage.
pub fn parse_document(bytes: &[u8]) -> Result<ExportDocument> {
    let document: ExportDocument = serde_yaml::from_slice(bytes)
        .map_err(|e| TrackerError::validation(format!("This file is not a valid export: {}", e)))?;

    if document.version != EXPORT_VERSION {
        return Err(TrackerError::validation(format!(
            "Unsupported export version \"{}\", expected \"{}\".",
            document.version, EXPORT_VERSION
        )));
    }

    let mut pending: Vec<&ExportNode> = document.activities.iter().collect();
    while let Some(node) = pending.pop() {
        let name = node.name.trim();
        // Same rule as path parsing: a bare "/" inside a name is fine.
        if name.is_empty() || name.contains(PATH_SEPARATOR) {
            return Err(TrackerError::validation(format!(
                "Activity name \"{}\" is empty or contains \"{}\".",
                node.name, PATH_SEPARATOR
            )));
        }
        pending.extend(&node.children);
    }

    Ok(document)
}

/// Merge a document into the user's tree, top-down.
///
/// Nodes match existing rows on (name, parent, leaf flag); matches only take
/// the document's muted flag, misses are created.
pub async fn import_activities(pool: &SqlitePool, user_id: UserId, bytes: &[u8]) -> Result<ImportSummary> {
    let document = parse_document(bytes)?;
    let mut summary = ImportSummary::default();

    let mut pending: Vec<(&ExportNode, ActivityId)> = document
        .activities
        .iter()
        .rev()
        .map(|node| (node, ROOT_PARENT_ID))
        .collect();

    while let Some((node, parent_id)) = pending.pop() {
        let name = node.name.trim();
        let is_leaf = node.leaf_flag();

        let id = match activity::find_activity(pool, user_id, name, parent_id, is_leaf).await? {
            Some(existing) => {
                if existing.muted != node.muted {
                    activity::set_muted(pool, existing.id, node.muted).await?;
                    summary.updated += 1;
                } else {
                    summary.unchanged += 1;
                }
                existing.id
            }
            None => {
                summary.created += 1;
                activity::create_activity(
                    pool,
                    &NewActivity {
                        user_id,
                        name: name.to_string(),
                        parent_id,
                        is_leaf,
                        muted: node.muted,
                    },
                )
                .await?
            }
        };

        pending.extend(node.children.iter().rev().map(|child| (child, id)));
    }

    tree::recompute_muted_leaf_flags(pool, user_id).await?;

    info!(
        user_id,
        created = summary.created,
        updated = summary.updated,
        "Imported activities"
    );
    Ok(summary)
}
