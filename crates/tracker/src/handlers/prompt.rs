//! Prompt answers and prompt keyboard navigation.

use chrono::{DateTime, Utc};
use database::{activity, ActivityId, ActivityLogEntry, MessageId, User};

use crate::error::Result;
use crate::picker::{Picker, PROMPT_TEXT};
use crate::tracker::{prompt_minutes, Ack, Tracker};
use crate::tree;

impl Tracker {
    /// A prompt button: drill into a non-leaf, log a leaf.
    ///
    /// The entry is keyed by the prompt message, so picking again replaces
    /// the earlier answer.
    pub(crate) async fn execute_activity_log(
        &self,
        user: &User,
        message_id: MessageId,
        activity_id: ActivityId,
        minutes: i64,
        sent_at: DateTime<Utc>,
    ) -> Result<Ack> {
        let target = activity::get_activity(&self.pool, user.id, activity_id).await?;
        let picker = Picker::Log { minutes };

        if !target.is_leaf {
            let (title, keyboard) = picker.load(&self.pool, user.id, target.id).await?;
            self.sender
                .edit_text(user.chat_id, message_id, title, Some(keyboard))
                .await?;
            return Ok(Ack::Silent);
        }

        {
            // A concurrent delete must not leave the entry behind.
            let _guard = self.locks.lock(user.id).await;
            tree::log_activity(
                &self.pool,
                &ActivityLogEntry {
                    message_id,
                    user_id: user.id,
                    activity_id,
                    timestamp: sent_at,
                    interval_minutes: minutes,
                },
            )
            .await?;
        }
        let name = tree::full_activity_name(&self.pool, user.id, activity_id).await?;

        // Keep the root keyboard so the answer can be corrected.
        let (_, keyboard) = picker.load_root(&self.pool, user.id).await?;
        let text = format!("{}\n\n✅ {} ({} min)", PROMPT_TEXT, name, minutes);
        self.sender
            .edit_text(user.chat_id, message_id, &text, Some(keyboard))
            .await?;

        Ok(Ack::Text(format!("Logged {}", name)))
    }

    /// Reload the prompt keyboard at the root.
    pub(crate) async fn execute_refresh_prompt(&self, user: &User, message_id: MessageId) -> Result<Ack> {
        let minutes = prompt_minutes(user)?;
        let (title, keyboard) = Picker::Log { minutes }
            .load_root(&self.pool, user.id)
            .await?;
        self.sender
            .edit_text(user.chat_id, message_id, title, Some(keyboard))
            .await?;
        Ok(Ack::Silent)
    }
}
