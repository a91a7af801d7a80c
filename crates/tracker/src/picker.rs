//! Activity keyboards for the prompt, mute, unmute and delete flows.
//!
//! Every picker shows one level of the tree at a time. Tapping a non-leaf
//! drills down by editing the keyboard in place.

use database::{Activity, ActivityFilter, ActivityId, UserId, ROOT_PARENT_ID};
use sqlx::SqlitePool;

use crate::callback::CallbackCommand;
use crate::error::Result;
use crate::keyboard::{InlineButton, InlineKeyboard};
use crate::tree::ActivityForest;

/// Text of a scheduled prompt.
pub const PROMPT_TEXT: &str = "What are you doing?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picker {
    /// Answer a prompt; `minutes` is attributed to the chosen leaf.
    Log { minutes: i64 },
    Mute,
    Unmute,
    Delete,
}

impl Picker {
    /// Which rows this picker offers.
    pub fn filter(&self) -> ActivityFilter {
        match self {
            Self::Log { .. } | Self::Mute => ActivityFilter::unmuted(),
            Self::Unmute => ActivityFilter::muted_or_hiding_muted(),
            Self::Delete => ActivityFilter::all(),
        }
    }

    /// Message text above the keyboard. `empty` is true when the level has
    /// no rows to offer.
    pub fn title(&self, empty: bool) -> &'static str {
        match (self, empty) {
            (Self::Log { .. }, false) => PROMPT_TEXT,
            (Self::Log { .. }, true) => {
                "What are you doing? You have no activities yet, add one below."
            }
            (Self::Mute, false) => "Choose an activity to mute:",
            (Self::Mute, true) => "There is nothing left to mute.",
            (Self::Unmute, false) => "Choose an activity to unmute:",
            (Self::Unmute, true) => "No muted activities.",
            (Self::Delete, false) => "Choose an activity to delete. 🗑 removes it with everything inside:",
            (Self::Delete, true) => "You have no activities.",
        }
    }

    /// Keyboard for the children of `parent_id`.
    pub fn keyboard(&self, forest: &ActivityForest, parent_id: ActivityId) -> InlineKeyboard {
        let mut keyboard = InlineKeyboard::new();
        for activity in forest.children(parent_id) {
            keyboard = keyboard.row(self.row(activity));
        }
        self.footer(keyboard)
    }

    /// Load the user's rows and build the keyboard for `parent_id`.
    ///
    /// Returns the title to show with it.
    pub async fn load(
        &self,
        pool: &SqlitePool,
        user_id: UserId,
        parent_id: ActivityId,
    ) -> Result<(&'static str, InlineKeyboard)> {
        let forest = ActivityForest::load(pool, user_id, self.filter()).await?;
        let empty = forest.children(parent_id).next().is_none();
        Ok((self.title(empty), self.keyboard(&forest, parent_id)))
    }

    /// Root-level keyboard.
    pub async fn load_root(&self, pool: &SqlitePool, user_id: UserId) -> Result<(&'static str, InlineKeyboard)> {
        self.load(pool, user_id, ROOT_PARENT_ID).await
    }

    fn row(&self, activity: &Activity) -> Vec<InlineButton> {
        let id = activity.id;
        let name = if activity.is_leaf {
            activity.name.clone()
        } else {
            format!("{} ›", activity.name)
        };

        match self {
            Self::Log { minutes } => vec![InlineButton::new(
                name,
                CallbackCommand::ActivityLog {
                    activity_id: id,
                    minutes: *minutes,
                },
            )],
            Self::Mute => vec![InlineButton::new(name, CallbackCommand::Mute(id))],
            Self::Unmute => {
                let label = if activity.muted {
                    format!("🔇 {}", name)
                } else {
                    name
                };
                vec![InlineButton::new(label, CallbackCommand::Unmute(id))]
            }
            Self::Delete if activity.is_leaf => {
                vec![InlineButton::new(format!("🗑 {}", name), CallbackCommand::Delete(id))]
            }
            Self::Delete => vec![
                InlineButton::new(format!("📂 {}", name), CallbackCommand::DeleteOpen(id)),
                InlineButton::new("🗑", CallbackCommand::Delete(id)),
            ],
        }
    }

    fn footer(&self, keyboard: InlineKeyboard) -> InlineKeyboard {
        match self {
            Self::Log { .. } => keyboard
                .button("➕ Add new activity", CallbackCommand::RegisterNewActivity)
                .button("🔄 Refresh activities", CallbackCommand::RefreshActivities),
            Self::Mute => keyboard.row(vec![
                InlineButton::new("❌ Cancel", CallbackCommand::MuteCancel),
                InlineButton::new("🔄 Refresh", CallbackCommand::MuteRefresh),
            ]),
            Self::Unmute => keyboard.row(vec![
                InlineButton::new("❌ Cancel", CallbackCommand::UnmuteCancel),
                InlineButton::new("🔄 Refresh", CallbackCommand::UnmuteRefresh),
            ]),
            Self::Delete => keyboard.row(vec![
                InlineButton::new("❌ Cancel", CallbackCommand::DeleteCancel),
                InlineButton::new("🔄 Refresh", CallbackCommand::DeleteRefresh),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: ActivityId, parent_id: ActivityId, name: &str, is_leaf: bool, muted: bool) -> Activity {
        Activity {
            id,
            user_id: 1,
            name: name.to_string(),
            parent_id,
            is_leaf,
            muted,
            has_muted_leaves: muted,
        }
    }

    fn forest() -> ActivityForest {
        ActivityForest::new(vec![
            node(1, ROOT_PARENT_ID, "Work", false, false),
            node(2, 1, "Coding", true, false),
            node(3, ROOT_PARENT_ID, "Sleep", true, false),
        ])
    }

    #[test]
    fn test_log_keyboard() {
        let keyboard = Picker::Log { minutes: 30 }.keyboard(&forest(), ROOT_PARENT_ID);
        assert_eq!(
            keyboard.tokens(),
            vec![
                "activity_log 1 30",
                "activity_log 3 30",
                "register_new_activity",
                "refresh_activities"
            ]
        );
        assert_eq!(keyboard.rows[0][0].text, "Work ›");
        assert_eq!(keyboard.rows[1][0].text, "Sleep");
    }

    #[test]
    fn test_drill_down_level() {
        let keyboard = Picker::Mute.keyboard(&forest(), 1);
        assert_eq!(
            keyboard.tokens(),
            vec!["mute_activity__mute 2", "mute_activity__cancel", "mute_activity__refresh"]
        );
    }

    #[test]
    fn test_delete_keyboard_opens_branches() {
        let keyboard = Picker::Delete.keyboard(&forest(), ROOT_PARENT_ID);
        assert_eq!(keyboard.rows[0].len(), 2);
        assert_eq!(keyboard.rows[0][0].data, "delete_activity__open 1");
        assert_eq!(keyboard.rows[0][1].data, "delete_activity__delete 1");
        assert_eq!(keyboard.rows[1][0].data, "delete_activity__delete 3");
    }

    #[test]
    fn test_unmute_marks_muted_rows() {
        let forest = ActivityForest::new(vec![
            node(1, ROOT_PARENT_ID, "Work", false, false),
            node(2, 1, "Coding", true, true),
        ]);
        let keyboard = Picker::Unmute.keyboard(&forest, 1);
        assert_eq!(keyboard.rows[0][0].text, "🔇 Coding");
        assert_eq!(Picker::Unmute.filter(), ActivityFilter::muted_or_hiding_muted());
    }

    #[test]
    fn test_empty_titles() {
        assert_eq!(Picker::Log { minutes: 10 }.title(false), PROMPT_TEXT);
        assert_ne!(Picker::Mute.title(true), Picker::Mute.title(false));
    }
}
