//! Mute, unmute and delete pickers.

use database::{activity, ActivityId, MessageId, User, ROOT_PARENT_ID};
use tracing::info;

use crate::error::Result;
use crate::keyboard::Markup;
use crate::picker::Picker;
use crate::tracker::{Ack, Tracker};
use crate::tree;

impl Tracker {
    /// Send a picker at the root level.
    pub(crate) async fn open_picker(&self, user: &User, picker: Picker) -> Result<()> {
        let (title, keyboard) = picker.load_root(&self.pool, user.id).await?;
        self.sender
            .send_text(user.chat_id, title, Markup::Keyboard(keyboard))
            .await?;
        Ok(())
    }

    /// Show the children of `parent_id` in place, optionally after a status
    /// line.
    pub(crate) async fn show_picker(
        &self,
        user: &User,
        message_id: MessageId,
        picker: Picker,
        parent_id: ActivityId,
        status: Option<String>,
    ) -> Result<()> {
        if parent_id != ROOT_PARENT_ID {
            // Only the user's own nodes can be opened.
            activity::get_activity(&self.pool, user.id, parent_id).await?;
        }

        let (title, keyboard) = picker.load(&self.pool, user.id, parent_id).await?;
        let text = match status {
            Some(status) => format!("{}\n\n{}", status, title),
            None => title.to_string(),
        };
        self.sender
            .edit_text(user.chat_id, message_id, &text, Some(keyboard))
            .await?;
        Ok(())
    }

    pub(crate) async fn refresh_picker(&self, user: &User, message_id: MessageId, picker: Picker) -> Result<Ack> {
        self.show_picker(user, message_id, picker, ROOT_PARENT_ID, None)
            .await?;
        Ok(Ack::Silent)
    }

    pub(crate) async fn execute_mute(&self, user: &User, message_id: MessageId, id: ActivityId) -> Result<Ack> {
        let target = activity::get_activity(&self.pool, user.id, id).await?;
        if !target.is_leaf {
            self.show_picker(user, message_id, Picker::Mute, id, None)
                .await?;
            return Ok(Ack::Silent);
        }

        let name = tree::full_activity_name(&self.pool, user.id, id).await?;
        let muted = {
            let _guard = self.locks.lock(user.id).await;
            tree::mute_activity(&self.pool, user.id, id).await?
        };
        info!(user_id = user.id, activity_id = id, propagated = muted.len() - 1, "Muted {}", name);

        let status = format!("🔇 \"{}\" muted.", name);
        self.show_picker(user, message_id, Picker::Mute, ROOT_PARENT_ID, Some(status))
            .await?;
        Ok(Ack::Text("Muted".to_string()))
    }

    pub(crate) async fn execute_unmute(&self, user: &User, message_id: MessageId, id: ActivityId) -> Result<Ack> {
        let target = activity::get_activity(&self.pool, user.id, id).await?;
        if !target.is_leaf {
            self.show_picker(user, message_id, Picker::Unmute, id, None)
                .await?;
            return Ok(Ack::Silent);
        }

        let name = tree::full_activity_name(&self.pool, user.id, id).await?;
        {
            let _guard = self.locks.lock(user.id).await;
            tree::unmute_activity(&self.pool, user.id, id).await?;
        }
        info!(user_id = user.id, activity_id = id, "Unmuted {}", name);

        let status = format!("🔔 \"{}\" unmuted.", name);
        self.show_picker(user, message_id, Picker::Unmute, ROOT_PARENT_ID, Some(status))
            .await?;
        Ok(Ack::Text("Unmuted".to_string()))
    }

    pub(crate) async fn execute_delete(&self, user: &User, message_id: MessageId, id: ActivityId) -> Result<Ack> {
        let name = tree::full_activity_name(&self.pool, user.id, id).await?;
        let removed = {
            let _guard = self.locks.lock(user.id).await;
            tree::delete_activity_recursive(&self.pool, user.id, id).await?
        };
        info!(user_id = user.id, activity_id = id, removed = removed.len(), "Deleted {}", name);

        let status = if removed.len() > 1 {
            format!("🗑 \"{}\" deleted with {} nested activities.", name, removed.len() - 1)
        } else {
            format!("🗑 \"{}\" deleted.", name)
        };
        self.show_picker(user, message_id, Picker::Delete, ROOT_PARENT_ID, Some(status))
            .await?;
        Ok(Ack::Text("Deleted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use database::{activity, ActivityFilter};

    use crate::handlers::testing::{callback, command, Harness};
    use crate::keyboard::Markup;
    use crate::sender::testing::Sent;
    use crate::tree;

    async fn id_of(h: &Harness, name: &str) -> i64 {
        activity::list_activities(h.pool(), 1, ActivityFilter::all())
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.name == name)
            .unwrap()
            .id
    }

    fn last_keyboard_tokens(h: &Harness) -> Vec<String> {
        match h.sender.sent().into_iter().rev().find_map(|s| match s {
            Sent::Edit { keyboard: Some(k), .. } => Some(k),
            Sent::Text { markup: Markup::Keyboard(k), .. } => Some(k),
            _ => None,
        }) {
            Some(k) => k.tokens().into_iter().map(str::to_string).collect(),
            None => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_mute_flow() {
        let h = Harness::new().await;
        tree::parse_and_add_activity(h.pool(), 1, "Work / Coding").await.unwrap();
        tree::parse_and_add_activity(h.pool(), 1, "Sleep").await.unwrap();
        let work = id_of(&h, "Work").await;
        let coding = id_of(&h, "Coding").await;

        h.tracker.handle(command(1, "/mute_activity")).await;
        assert!(last_keyboard_tokens(&h).contains(&format!("mute_activity__mute {}", work)));

        // Drill into Work, then mute its only leaf.
        h.tracker
            .handle(callback(1, 1001, &format!("mute_activity__mute {}", work), Utc::now()))
            .await;
        assert_eq!(last_keyboard_tokens(&h)[0], format!("mute_activity__mute {}", coding));

        h.tracker
            .handle(callback(1, 1001, &format!("mute_activity__mute {}", coding), Utc::now()))
            .await;
        assert!(matches!(
            h.sender.last(),
            Some(Sent::Answer { text: Some(t), .. }) if t == "Muted"
        ));
        assert!(activity::get_activity(h.pool(), 1, work).await.unwrap().muted);

        // Work is gone from the mute picker, Sleep remains.
        let tokens = last_keyboard_tokens(&h);
        assert!(!tokens.contains(&format!("mute_activity__mute {}", work)));
        assert_eq!(tokens.len(), 3);
    }

    #[tokio::test]
    async fn test_unmute_flow() {
        let h = Harness::new().await;
        let coding = tree::parse_and_add_activity(h.pool(), 1, "Work / Coding").await.unwrap();
        tree::mute_activity(h.pool(), 1, coding).await.unwrap();
        let work = id_of(&h, "Work").await;

        h.tracker.handle(command(1, "/unmute_activity")).await;
        assert_eq!(last_keyboard_tokens(&h)[0], format!("unmute_activity__unmute {}", work));

        h.tracker
            .handle(callback(1, 1001, &format!("unmute_activity__unmute {}", coding), Utc::now()))
            .await;
        assert!(!activity::get_activity(h.pool(), 1, work).await.unwrap().muted);
        assert!(!activity::get_activity(h.pool(), 1, coding).await.unwrap().muted);
        assert!(h.sender.texts().last().unwrap().contains("No muted activities."));
    }

    #[tokio::test]
    async fn test_delete_flow() {
        let h = Harness::new().await;
        tree::parse_and_add_activity(h.pool(), 1, "Work / Coding / Rust").await.unwrap();
        tree::parse_and_add_activity(h.pool(), 1, "Sleep").await.unwrap();
        let work = id_of(&h, "Work").await;
        let coding = id_of(&h, "Coding").await;

        h.tracker
            .handle(callback(1, 1001, &format!("delete_activity__open {}", work), Utc::now()))
            .await;
        assert_eq!(
            last_keyboard_tokens(&h)[..2],
            [
                format!("delete_activity__open {}", coding),
                format!("delete_activity__delete {}", coding)
            ]
        );

        h.tracker
            .handle(callback(1, 1001, &format!("delete_activity__delete {}", work), Utc::now()))
            .await;
        assert!(h
            .sender
            .texts()
            .last()
            .unwrap()
            .starts_with("🗑 \"Work\" deleted with 2 nested activities."));
        let routes = tree::full_activities(h.pool(), 1).await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].name, "Sleep");

        // A stale button on an already deleted node.
        h.tracker
            .handle(callback(1, 1001, &format!("delete_activity__delete {}", work), Utc::now()))
            .await;
        assert!(matches!(
            h.sender.last(),
            Some(Sent::Answer { text: Some(t), .. }) if t.contains("no longer exists")
        ));
    }

    #[tokio::test]
    async fn test_other_users_nodes_are_not_reachable() {
        let h = Harness::new().await;
        let theirs = tree::parse_and_add_activity(h.pool(), 2, "Secret").await.unwrap();

        h.tracker
            .handle(callback(1, 1001, &format!("delete_activity__delete {}", theirs), Utc::now()))
            .await;
        assert!(activity::get_activity(h.pool(), 2, theirs).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_clears_keyboard() {
        let h = Harness::new().await;
        h.tracker
            .handle(callback(1, 1001, "mute_activity__cancel", Utc::now()))
            .await;
        assert!(h.sender.sent().iter().any(|s| matches!(
            s,
            Sent::Edit { text, keyboard: None, .. } if text == "Cancelled."
        )));
    }
}
