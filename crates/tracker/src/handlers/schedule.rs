//! Setup wizard and notification switches.

use database::{user, MessageId, User};
use tracing::info;

use crate::callback::CallbackCommand;
use crate::error::{Result, TrackerError};
use crate::keyboard::{InlineButton, InlineKeyboard, Markup};
use crate::scheduler::schedule_of;
use crate::tracker::{Ack, Tracker};

/// Interval choices offered by the wizard.
pub const TIMER_CHOICES: [i64; 4] = [10, 20, 30, 60];
/// Morning hours offered by the wizard.
pub const MORNING_CHOICES: [u32; 8] = [3, 4, 5, 6, 7, 8, 9, 10];
/// Evening hours offered by the wizard.
pub const EVENING_CHOICES: [u32; 6] = [18, 19, 20, 21, 22, 23];

const WELCOME: &str = "Hi! I'll ask what you're doing at regular intervals and keep track of your time.\n\nHow often should I ask?";

fn timer_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row(
        TIMER_CHOICES
            .iter()
            .map(|m| InlineButton::new(format!("{} min", m), CallbackCommand::SetTimerMinutes(*m)))
            .collect(),
    )
}

fn hour_keyboard(hours: &[u32], command: fn(u32) -> CallbackCommand) -> InlineKeyboard {
    hours.chunks(4).fold(InlineKeyboard::new(), |keyboard, chunk| {
        keyboard.row(
            chunk
                .iter()
                .map(|h| InlineButton::new(format!("{:02}:00", h), command(*h)))
                .collect(),
        )
    })
}

fn switch_keyboard(enabled: bool) -> InlineKeyboard {
    if enabled {
        InlineKeyboard::new().button("🔕 Disable notifications", CallbackCommand::DisableNotifications)
    } else {
        InlineKeyboard::new().button("🔔 Enable notifications", CallbackCommand::EnableNotifications)
    }
}

/// `every 30 min between 07:00 and 19:00 UTC`
fn describe(user: &User) -> String {
    match (user.interval_minutes, user.morning_start_hour, user.evening_finish_hour) {
        (Some(m), Some(start), Some(end)) => {
            format!("every {} min between {:02}:00 and {:02}:00 UTC", m, start, end)
        }
        _ => "not set up yet".to_string(),
    }
}

impl Tracker {
    /// `/start`: first step of the wizard.
    pub(crate) async fn execute_start(&self, user: &User) -> Result<()> {
        self.sender
            .send_text(user.chat_id, WELCOME, Markup::Keyboard(timer_keyboard()))
            .await?;
        Ok(())
    }

    pub(crate) async fn execute_set_timer(&self, user: &User, message_id: MessageId, minutes: i64) -> Result<Ack> {
        if !(1..=24 * 60).contains(&minutes) {
            return Err(TrackerError::validation(format!(
                "{} minutes is not a usable interval.",
                minutes
            )));
        }

        let mut updated = user.clone();
        updated.interval_minutes = Some(minutes);
        user::update_user(&self.pool, &updated).await?;

        let text = format!(
            "I'll ask every {} min.\n\nWhen does your day start? (UTC)",
            minutes
        );
        self.sender
            .edit_text(
                user.chat_id,
                message_id,
                &text,
                Some(hour_keyboard(&MORNING_CHOICES, CallbackCommand::SetMorningStartHour)),
            )
            .await?;
        Ok(Ack::Silent)
    }

    pub(crate) async fn execute_set_morning(&self, user: &User, message_id: MessageId, hour: u32) -> Result<Ack> {
        let mut updated = user.clone();
        updated.morning_start_hour = Some(hour);
        user::update_user(&self.pool, &updated).await?;

        let text = format!(
            "Your day starts at {:02}:00.\n\nWhen should I stop asking? (UTC)",
            hour
        );
        self.sender
            .edit_text(
                user.chat_id,
                message_id,
                &text,
                Some(hour_keyboard(&EVENING_CHOICES, CallbackCommand::SetEveningFinishHour)),
            )
            .await?;
        Ok(Ack::Silent)
    }

    pub(crate) async fn execute_set_evening(&self, user: &User, message_id: MessageId, hour: u32) -> Result<Ack> {
        let mut updated = user.clone();
        updated.evening_finish_hour = Some(hour);
        user::update_user(&self.pool, &updated).await?;

        let text = format!(
            "Schedule: {}.\n\nTurn notifications on when you're ready.",
            describe(&updated)
        );
        self.sender
            .edit_text(user.chat_id, message_id, &text, Some(switch_keyboard(false)))
            .await?;
        Ok(Ack::Silent)
    }

    pub(crate) async fn execute_enable_button(&self, user: &User, message_id: MessageId) -> Result<Ack> {
        let text = self.enable_notifications(user).await?;
        self.sender
            .edit_text(user.chat_id, message_id, &text, Some(switch_keyboard(true)))
            .await?;
        Ok(Ack::Text("Notifications enabled".to_string()))
    }

    pub(crate) async fn execute_disable_button(&self, user: &User, message_id: MessageId) -> Result<Ack> {
        let text = self.disable_notifications(user).await?;
        self.sender
            .edit_text(user.chat_id, message_id, &text, Some(switch_keyboard(false)))
            .await?;
        Ok(Ack::Text("Notifications disabled".to_string()))
    }

    pub(crate) async fn execute_start_notify(&self, user: &User) -> Result<()> {
        let text = self.enable_notifications(user).await?;
        self.sender.send_text(user.chat_id, &text, Markup::None).await?;
        Ok(())
    }

    pub(crate) async fn execute_stop_notify(&self, user: &User) -> Result<()> {
        let text = self.disable_notifications(user).await?;
        self.sender.send_text(user.chat_id, &text, Markup::None).await?;
        Ok(())
    }

    /// Turn prompts on. An incomplete schedule is rejected here so the
    /// scheduler never sees one.
    async fn enable_notifications(&self, user: &User) -> Result<String> {
        schedule_of(user)?;

        let mut updated = user.clone();
        updated.notifications_enabled = true;
        user::update_user(&self.pool, &updated).await?;
        info!(user_id = user.id, "Notifications enabled");

        Ok(format!("🔔 Notifications enabled: {}.", describe(&updated)))
    }

    async fn disable_notifications(&self, user: &User) -> Result<String> {
        let mut updated = user.clone();
        updated.notifications_enabled = false;
        user::update_user(&self.pool, &updated).await?;
        info!(user_id = user.id, "Notifications disabled");

        Ok("🔕 Notifications disabled. Use /start_notify to turn them back on.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::handlers::testing::{callback, command, Harness};
    use crate::sender::testing::Sent;

    #[tokio::test]
    async fn test_wizard_walkthrough() {
        let h = Harness::new().await;

        h.tracker.handle(command(1, "/start")).await;
        let wizard_id = match h.sender.last() {
            Some(Sent::Text {
                message_id,
                markup: Markup::Keyboard(keyboard),
                ..
            }) => {
                assert_eq!(keyboard.tokens().len(), TIMER_CHOICES.len());
                message_id
            }
            other => panic!("unexpected {:?}", other),
        };

        for token in [
            "start__set_timer_minutes 30",
            "start__schedule_morning_start_hour 7",
            "start__schedule_evening_finish_hour 19",
            "start__enable_notifications",
        ] {
            h.tracker
                .handle(callback(1, wizard_id, token, Utc::now()))
                .await;
        }

        let user = h.user(1).await;
        assert_eq!(user.interval_minutes, Some(30));
        assert_eq!(user.morning_start_hour, Some(7));
        assert_eq!(user.evening_finish_hour, Some(19));
        assert!(user.notifications_enabled);
        assert!(h
            .sender
            .texts()
            .last()
            .unwrap()
            .contains("every 30 min between 07:00 and 19:00 UTC"));
    }

    #[tokio::test]
    async fn test_enable_requires_complete_schedule() {
        let h = Harness::new().await;
        h.tracker.handle(command(1, "/start_notify")).await;

        assert!(h.sender.texts().last().unwrap().starts_with("⚙️"));
        assert!(!h.user(1).await.notifications_enabled);

        h.tracker
            .handle(callback(1, 9, "start__enable_notifications", Utc::now()))
            .await;
        assert!(matches!(
            h.sender.last(),
            Some(Sent::Answer { text: Some(t), .. }) if t.starts_with("⚙️")
        ));
    }

    #[tokio::test]
    async fn test_stop_and_start_notify() {
        let h = Harness::new().await;
        h.scheduled_user(1, 20).await;

        h.tracker.handle(command(1, "/start_notify")).await;
        assert!(h.user(1).await.notifications_enabled);

        h.tracker.handle(command(1, "/stop_notify")).await;
        assert!(!h.user(1).await.notifications_enabled);
        assert!(h.sender.texts().last().unwrap().contains("disabled"));
    }

    #[tokio::test]
    async fn test_rejects_forged_interval() {
        let h = Harness::new().await;
        h.tracker
            .handle(callback(1, 9, "start__set_timer_minutes 0", Utc::now()))
            .await;
        assert_eq!(h.user(1).await.interval_minutes, None);
    }
}
