//! Event dispatch: one entry point for every inbound chat event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use database::{user, MessageId, User};
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::callback::CallbackCommand;
use crate::chart::{ChartRenderer, CommandChartRenderer};
use crate::command::Command;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::event::{EventKind, InboundEvent};
use crate::keyboard::Markup;
use crate::locks::UserLocks;
use crate::picker::Picker;
use crate::sender::MessageSender;
use crate::session::{Delivery, SessionRegistry};
use crate::shutdown::Shutdown;

/// How a button press is acknowledged once its handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Ack {
    /// Stop the client's spinner without a notice.
    Silent,
    /// Show a transient notice.
    Text(String),
    /// The handler already answered.
    Done,
}

/// The time tracker core.
///
/// Cheap to clone; every clone shares the session registry, the per-user
/// locks and the outbound transport.
#[derive(Clone)]
pub struct Tracker {
    pub(crate) pool: SqlitePool,
    pub(crate) sender: Arc<dyn MessageSender>,
    pub(crate) sessions: Arc<SessionRegistry>,
    pub(crate) locks: Arc<UserLocks>,
    pub(crate) config: Arc<TrackerConfig>,
    pub(crate) chart: Option<Arc<dyn ChartRenderer>>,
    pub(crate) shutdown: Shutdown,
}

impl Tracker {
    /// Create a tracker. A chart renderer is set up when the configuration
    /// names a chart command.
    pub fn new(
        pool: SqlitePool,
        sender: Arc<dyn MessageSender>,
        config: TrackerConfig,
        shutdown: Shutdown,
    ) -> Self {
        let chart = CommandChartRenderer::from_config(&config)
            .map(|renderer| Arc::new(renderer) as Arc<dyn ChartRenderer>);

        Self {
            pool,
            sender,
            sessions: SessionRegistry::new(),
            locks: Arc::new(UserLocks::new()),
            config: Arc::new(config),
            chart,
            shutdown,
        }
    }

    /// Replace the chart renderer. `None` falls back to text breakdowns.
    pub fn with_chart_renderer(mut self, chart: Option<Arc<dyn ChartRenderer>>) -> Self {
        self.chart = chart;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Handle one inbound event.
    ///
    /// Never fails: errors are logged and reported to the chat, callbacks are
    /// always answered.
    pub async fn handle(&self, event: InboundEvent) {
        debug!(
            user_id = event.user_id,
            kind = event.kind_name(),
            "Handling event"
        );

        if let EventKind::Callback { id, data, sent_at } = &event.kind {
            self.handle_callback(&event, id, data, *sent_at).await;
            return;
        }

        if let Err(e) = self.handle_message(&event).await {
            self.report(event.user_id, event.chat_id, &e).await;
        }
    }

    /// Send a prompt with the root-level activity keyboard.
    pub async fn send_prompt(&self, user: &User) -> Result<MessageId> {
        let minutes = prompt_minutes(user)?;
        let (title, keyboard) = Picker::Log { minutes }
            .load_root(&self.pool, user.id)
            .await?;
        let message_id = self
            .sender
            .send_text(user.chat_id, title, Markup::Keyboard(keyboard))
            .await?;
        info!(user_id = user.id, message_id, "Sent prompt");
        Ok(message_id)
    }

    async fn handle_message(&self, event: &InboundEvent) -> Result<()> {
        match &event.kind {
            EventKind::Command { name, args } => {
                let command: Command = name.parse()?;
                let user = user::ensure_user(&self.pool, event.user_id, event.chat_id).await?;
                info!(user_id = user.id, command = command.name(), "Command");
                self.execute_command(&user, command, args).await
            }
            EventKind::Text(text) => {
                match self.sessions.deliver(event.user_id, text.clone()) {
                    Delivery::Delivered => debug!(user_id = event.user_id, "Delivered reply"),
                    Delivery::Dropped => {
                        debug!(user_id = event.user_id, "No command waiting, dropped text")
                    }
                }
                Ok(())
            }
            EventKind::Document { file_id, file_name } => {
                let user = user::ensure_user(&self.pool, event.user_id, event.chat_id).await?;
                self.execute_import_document(&user, file_id, file_name.as_deref())
                    .await
            }
            EventKind::Callback { .. } => Ok(()),
        }
    }

    async fn execute_command(&self, user: &User, command: Command, args: &str) -> Result<()> {
        match command {
            Command::Start => self.execute_start(user).await,
            Command::RegisterNewActivity => self.execute_register_command(user, args).await,
            Command::StartNotify => self.execute_start_notify(user).await,
            Command::StopNotify => self.execute_stop_notify(user).await,
            Command::TestNotify => self.send_prompt(user).await.map(|_| ()),
            Command::MuteActivity => self.open_picker(user, Picker::Mute).await,
            Command::UnmuteActivity => self.open_picker(user, Picker::Unmute).await,
            Command::DeleteActivity => self.open_picker(user, Picker::Delete).await,
            Command::ExportActivities => self.execute_export(user).await,
            Command::ImportActivities => self.execute_import_instructions(user).await,
            Command::Analytics => self.execute_analytics_menu(user).await,
            Command::GetDayStatistics => self.execute_get_day_statistics(user, args).await,
            Command::TestDayStatsRoutine => self.execute_day_stats_routine(user).await,
            Command::Cancel => self.execute_cancel(user).await,
        }
    }

    async fn handle_callback(
        &self,
        event: &InboundEvent,
        callback_id: &str,
        data: &str,
        sent_at: DateTime<Utc>,
    ) {
        let notice = match self.run_callback(event, callback_id, data, sent_at).await {
            Ok(Ack::Done) => return,
            Ok(Ack::Silent) => None,
            Ok(Ack::Text(text)) => Some(text),
            Err(e) => {
                log_failure(event.user_id, &e);
                Some(e.user_message())
            }
        };

        if let Err(e) = self
            .sender
            .answer_callback(callback_id, notice.as_deref())
            .await
        {
            warn!("Failed to answer callback {}: {}", callback_id, e);
        }
    }

    async fn run_callback(
        &self,
        event: &InboundEvent,
        callback_id: &str,
        data: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Ack> {
        let command: CallbackCommand = data.parse()?;
        let user = user::ensure_user(&self.pool, event.user_id, event.chat_id).await?;
        debug!(user_id = user.id, button = command.name(), "Callback");
        self.execute_callback(&user, event, callback_id, command, sent_at)
            .await
    }

    async fn execute_callback(
        &self,
        user: &User,
        event: &InboundEvent,
        callback_id: &str,
        command: CallbackCommand,
        sent_at: DateTime<Utc>,
    ) -> Result<Ack> {
        let message_id = event.message_id;
        match command {
            CallbackCommand::ActivityLog {
                activity_id,
                minutes,
            } => {
                self.execute_activity_log(user, message_id, activity_id, minutes, sent_at)
                    .await
            }
            CallbackCommand::RegisterNewActivity => {
                self.execute_register_callback(user, callback_id).await
            }
            CallbackCommand::RefreshActivities => self.execute_refresh_prompt(user, message_id).await,

            CallbackCommand::SetTimerMinutes(minutes) => {
                self.execute_set_timer(user, message_id, minutes).await
            }
            CallbackCommand::SetMorningStartHour(hour) => {
                self.execute_set_morning(user, message_id, hour).await
            }
            CallbackCommand::SetEveningFinishHour(hour) => {
                self.execute_set_evening(user, message_id, hour).await
            }
            CallbackCommand::EnableNotifications => {
                self.execute_enable_button(user, message_id).await
            }
            CallbackCommand::DisableNotifications => {
                self.execute_disable_button(user, message_id).await
            }

            CallbackCommand::Mute(id) => self.execute_mute(user, message_id, id).await,
            CallbackCommand::Unmute(id) => self.execute_unmute(user, message_id, id).await,
            CallbackCommand::DeleteOpen(id) => {
                self.show_picker(user, message_id, Picker::Delete, id, None)
                    .await?;
                Ok(Ack::Silent)
            }
            CallbackCommand::Delete(id) => self.execute_delete(user, message_id, id).await,
            CallbackCommand::MuteRefresh => self.refresh_picker(user, message_id, Picker::Mute).await,
            CallbackCommand::UnmuteRefresh => {
                self.refresh_picker(user, message_id, Picker::Unmute).await
            }
            CallbackCommand::DeleteRefresh => {
                self.refresh_picker(user, message_id, Picker::Delete).await
            }
            CallbackCommand::MuteCancel
            | CallbackCommand::UnmuteCancel
            | CallbackCommand::DeleteCancel => {
                self.sender
                    .edit_text(user.chat_id, message_id, "Cancelled.", None)
                    .await?;
                Ok(Ack::Silent)
            }

            CallbackCommand::AnalyticsDayStats => self.execute_day_stats_menu(user, message_id).await,
            CallbackCommand::AnalyticsComparePeriods => {
                self.execute_compare_menu(user, message_id).await
            }
            CallbackCommand::AnalyticsBack | CallbackCommand::CompareBack => {
                self.execute_analytics_back(user, message_id).await
            }
            CallbackCommand::DayStats(preset) => self.execute_day_stats(user, preset).await,
            CallbackCommand::RefreshChart { start, end } => {
                self.execute_refresh_chart(user, message_id, start, end).await
            }
            CallbackCommand::SendDayChart { start, end } => {
                self.execute_send_day_chart(user, message_id, start, end).await
            }
            CallbackCommand::CompareWeeks => self.execute_compare_weeks(user, message_id).await,
            CallbackCommand::CompareMonths => self.execute_compare_months(user, message_id).await,
        }
    }

    async fn execute_cancel(&self, user: &User) -> Result<()> {
        // A waiting flow reports its own cancellation.
        if !self.sessions.end(user.id) {
            self.sender
                .send_text(user.chat_id, "Nothing to cancel.", Markup::None)
                .await?;
        }
        Ok(())
    }

    /// Tell the user why something failed.
    pub(crate) async fn report(&self, user_id: i64, chat_id: i64, err: &TrackerError) {
        log_failure(user_id, err);
        if let Err(e) = self
            .sender
            .send_text(chat_id, &err.user_message(), Markup::None)
            .await
        {
            warn!("Failed to report error to chat {}: {}", chat_id, e);
        }
    }
}

fn log_failure(user_id: i64, err: &TrackerError) {
    if err.is_user_error() {
        info!(user_id, "Request rejected: {}", err);
    } else {
        error!(user_id, "Request failed: {}", err);
    }
}

/// Minutes a prompt attributes to the chosen activity.
pub(crate) fn prompt_minutes(user: &User) -> Result<i64> {
    user.interval_minutes.ok_or_else(|| {
        TrackerError::configuration("Pick how often I should ask with /start first.")
    })
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("config", &self.config)
            .field("chart", &self.chart.is_some())
            .finish()
    }
}
