//! Analytics menus, period statistics and comparisons.

use chrono::{DateTime, Duration, Utc};
use database::{ActivityFilter, MessageId, User};
use tracing::{info, warn};

use crate::callback::CallbackCommand;
use crate::error::{Result, TrackerError};
use crate::keyboard::{InlineButton, InlineKeyboard, Markup};
use crate::stats::{self, Period, PeriodPreset};
use crate::tracker::{Ack, Tracker};
use crate::tree::ActivityForest;

const MENU_TEXT: &str = "📊 Analytics";
const ROUTINE_TEXT: &str = "Filled in everything for today? Press the button for your chart.";
const INTERVAL_USAGE: &str =
    "Usage: /get_day_statistics <start> <end>, e.g. /get_day_statistics 2025-03-01T00:00:00Z 2025-03-02T00:00:00Z";

fn menu_keyboard() -> InlineKeyboard {
    InlineKeyboard::new()
        .button("📅 Statistics", CallbackCommand::AnalyticsDayStats)
        .button("⚖️ Compare periods", CallbackCommand::AnalyticsComparePeriods)
}

fn presets_keyboard() -> InlineKeyboard {
    PeriodPreset::ALL
        .chunks(2)
        .fold(InlineKeyboard::new(), |keyboard, pair| {
            keyboard.row(
                pair.iter()
                    .map(|preset| InlineButton::new(preset.label(), CallbackCommand::DayStats(*preset)))
                    .collect(),
            )
        })
        .button("⬅️ Back", CallbackCommand::AnalyticsBack)
}

fn compare_keyboard() -> InlineKeyboard {
    InlineKeyboard::new()
        .button("This week vs last week", CallbackCommand::CompareWeeks)
        .button("This month vs last month", CallbackCommand::CompareMonths)
        .button("⬅️ Back", CallbackCommand::CompareBack)
}

/// Parse `<start> <end>` as two RFC 3339 times.
fn parse_interval(args: &str) -> Result<Period> {
    let bounds: Vec<&str> = args.split_whitespace().collect();
    let [start, end] = bounds.as_slice() else {
        return Err(TrackerError::validation(INTERVAL_USAGE));
    };

    let parse = |raw: &str| {
        DateTime::parse_from_rfc3339(raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|_| {
                TrackerError::validation(format!(
                    "\"{}\" is not an RFC 3339 time, e.g. 2025-03-01T00:00:00Z.",
                    raw
                ))
            })
    };
    Period::new(parse(*start)?, parse(*end)?)
}

fn refresh_keyboard(period: Period) -> InlineKeyboard {
    InlineKeyboard::new().button(
        "🔄 Refresh",
        CallbackCommand::RefreshChart {
            start: period.start.timestamp(),
            end: period.end.timestamp(),
        },
    )
}

impl Tracker {
    pub(crate) async fn execute_analytics_menu(&self, user: &User) -> Result<()> {
        self.sender
            .send_text(user.chat_id, MENU_TEXT, Markup::Keyboard(menu_keyboard()))
            .await?;
        Ok(())
    }

    pub(crate) async fn execute_analytics_back(&self, user: &User, message_id: MessageId) -> Result<Ack> {
        self.sender
            .edit_text(user.chat_id, message_id, MENU_TEXT, Some(menu_keyboard()))
            .await?;
        Ok(Ack::Silent)
    }

    pub(crate) async fn execute_day_stats_menu(&self, user: &User, message_id: MessageId) -> Result<Ack> {
        self.sender
            .edit_text(
                user.chat_id,
                message_id,
                "Which period?",
                Some(presets_keyboard()),
            )
            .await?;
        Ok(Ack::Silent)
    }

    pub(crate) async fn execute_compare_menu(&self, user: &User, message_id: MessageId) -> Result<Ack> {
        self.sender
            .edit_text(
                user.chat_id,
                message_id,
                "What should I compare?",
                Some(compare_keyboard()),
            )
            .await?;
        Ok(Ack::Silent)
    }

    pub(crate) async fn execute_day_stats(&self, user: &User, preset: PeriodPreset) -> Result<Ack> {
        let period = preset.period(Utc::now());
        self.send_stats(user, preset.label(), period).await?;
        Ok(Ack::Silent)
    }

    /// `/get_day_statistics <start> <end>`: statistics for any interval.
    pub(crate) async fn execute_get_day_statistics(&self, user: &User, args: &str) -> Result<()> {
        let period = parse_interval(args)?;
        self.send_stats(user, "Statistics", period).await
    }

    /// Offer the end-of-day chart for the last 24 hours.
    pub(crate) async fn execute_day_stats_routine(&self, user: &User) -> Result<()> {
        let now = Utc::now();
        let keyboard = InlineKeyboard::new().button(
            "📊 Show my day",
            CallbackCommand::SendDayChart {
                start: (now - Duration::days(1)).timestamp(),
                end: now.timestamp(),
            },
        );
        self.sender
            .send_text(user.chat_id, ROUTINE_TEXT, Markup::Keyboard(keyboard))
            .await?;
        info!(user_id = user.id, "Sent day stats button");
        Ok(())
    }

    /// The end-of-day button: the chart replaces the button message.
    pub(crate) async fn execute_send_day_chart(
        &self,
        user: &User,
        message_id: MessageId,
        start: i64,
        end: i64,
    ) -> Result<Ack> {
        let period = Period::from_unix(start, end)?;
        self.send_stats(user, "Last 24 hours", period).await?;
        if let Err(e) = self.sender.delete_message(user.chat_id, message_id).await {
            warn!("Failed to delete day stats button {}: {}", message_id, e);
        }
        Ok(Ack::Silent)
    }

    /// Redraw a chart: the new one replaces the old message.
    pub(crate) async fn execute_refresh_chart(
        &self,
        user: &User,
        message_id: MessageId,
        start: i64,
        end: i64,
    ) -> Result<Ack> {
        let period = Period::from_unix(start, end)?;
        self.send_stats(user, "Statistics", period).await?;
        if let Err(e) = self.sender.delete_message(user.chat_id, message_id).await {
            warn!("Failed to delete old chart {}: {}", message_id, e);
        }
        Ok(Ack::Text("Updated".to_string()))
    }

    pub(crate) async fn execute_compare_weeks(&self, user: &User, message_id: MessageId) -> Result<Ack> {
        self.send_comparison(
            user,
            message_id,
            "This week vs last week",
            PeriodPreset::ThisWeek,
            PeriodPreset::LastWeek,
        )
        .await
    }

    pub(crate) async fn execute_compare_months(&self, user: &User, message_id: MessageId) -> Result<Ack> {
        self.send_comparison(
            user,
            message_id,
            "This month vs last month",
            PeriodPreset::ThisMonth,
            PeriodPreset::LastMonth,
        )
        .await
    }

    async fn send_comparison(
        &self,
        user: &User,
        message_id: MessageId,
        title: &str,
        current: PeriodPreset,
        previous: PeriodPreset,
    ) -> Result<Ack> {
        let now = Utc::now();
        let comparison =
            stats::compare_periods(&self.pool, user.id, current.period(now), previous.period(now))
                .await?;
        let text = stats::format_comparison(&comparison, title);
        self.sender
            .edit_text(user.chat_id, message_id, &text, Some(compare_keyboard()))
            .await?;
        Ok(Ack::Silent)
    }

    /// Send a chart for `period`, or a text breakdown when no chart can be
    /// drawn.
    async fn send_stats(&self, user: &User, label: &str, period: Period) -> Result<()> {
        let title = format!("{} ({})", label, period.label());

        if let Some(chart) = &self.chart {
            let nodes = stats::chart_data(&self.pool, user.id, period).await?;
            match chart.render(&title, &nodes).await {
                Ok(image) => {
                    self.sender
                        .send_photo(
                            user.chat_id,
                            "chart.png",
                            image,
                            Some(&title),
                            Some(refresh_keyboard(period)),
                        )
                        .await?;
                    return Ok(());
                }
                Err(e) => warn!(user_id = user.id, "Chart rendering failed: {}", e),
            }
        }

        let forest = ActivityForest::load(&self.pool, user.id, ActivityFilter::all()).await?;
        let durations = stats::durations(&self.pool, user.id, period).await?;
        let text = stats::format_breakdown(&forest.routes(), &durations, &title);
        self.sender
            .send_text(user.chat_id, &text, Markup::Keyboard(refresh_keyboard(period)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use database::ActivityLogEntry;

    use crate::chart::ChartRenderer;
    use crate::error::{Result, TrackerError};
    use crate::handlers::testing::{callback, command, Harness};
    use crate::keyboard::Markup;
    use crate::sender::testing::Sent;
    use crate::stats::ChartNode;
    use crate::tree;

    struct FixedRenderer(Option<Vec<u8>>);

    #[async_trait]
    impl ChartRenderer for FixedRenderer {
        async fn render(&self, _title: &str, nodes: &[ChartNode]) -> Result<Vec<u8>> {
            assert!(!nodes.is_empty());
            self.0
                .clone()
                .ok_or_else(|| TrackerError::Render("boom".to_string()))
        }
    }

    async fn log_now(h: &Harness, path: &str, minutes: i64) {
        let id = tree::parse_and_add_activity(h.pool(), 1, path).await.unwrap();
        tree::log_activity(
            h.pool(),
            &ActivityLogEntry {
                message_id: id,
                user_id: 1,
                activity_id: id,
                timestamp: Utc::now() - chrono::Duration::minutes(1),
                interval_minutes: minutes,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_day_stats_text_fallback() {
        let h = Harness::new().await;
        log_now(&h, "Work / Coding", 90).await;

        h.tracker
            .handle(callback(1, 1001, "day_stats__today", Utc::now()))
            .await;

        let sent = h.sender.sent();
        match &sent[0] {
            Sent::Text {
                text,
                markup: Markup::Keyboard(keyboard),
                ..
            } => {
                assert!(text.starts_with("Today ("));
                assert!(text.contains("• Work / Coding: 1 h 30 min"));
                assert!(keyboard.tokens()[0].starts_with("day_stats__refresh_chart "));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_day_stats_chart_and_refresh() {
        let mut h = Harness::new().await;
        h.tracker = h
            .tracker
            .clone()
            .with_chart_renderer(Some(Arc::new(FixedRenderer(Some(b"png".to_vec())))));
        log_now(&h, "Sleep", 60).await;

        h.tracker
            .handle(callback(1, 1001, "day_stats__this_week", Utc::now()))
            .await;
        let token = match &h.sender.sent()[0] {
            Sent::Photo {
                bytes,
                keyboard: Some(keyboard),
                ..
            } => {
                assert_eq!(bytes, b"png");
                keyboard.tokens()[0].to_string()
            }
            other => panic!("unexpected {:?}", other),
        };

        h.tracker.handle(callback(1, 1500, &token, Utc::now())).await;
        let sent = h.sender.sent();
        assert!(matches!(sent[2], Sent::Photo { .. }));
        assert!(matches!(sent[3], Sent::Delete { message_id: 1500, .. }));
    }

    #[tokio::test]
    async fn test_render_failure_falls_back_to_text() {
        let mut h = Harness::new().await;
        h.tracker = h
            .tracker
            .clone()
            .with_chart_renderer(Some(Arc::new(FixedRenderer(None))));
        log_now(&h, "Sleep", 60).await;

        h.tracker
            .handle(callback(1, 1001, "day_stats__today", Utc::now()))
            .await;
        assert!(h.sender.texts()[0].contains("• Sleep: 1 h 0 min"));
    }

    #[tokio::test]
    async fn test_get_day_statistics_for_interval() {
        let h = Harness::new().await;
        let id = tree::parse_and_add_activity(h.pool(), 1, "Work / Coding").await.unwrap();
        for (message_id, day) in [(1, 1), (2, 2), (3, 3)] {
            tree::log_activity(
                h.pool(),
                &ActivityLogEntry {
                    message_id,
                    user_id: 1,
                    activity_id: id,
                    timestamp: Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap(),
                    interval_minutes: 30,
                },
            )
            .await
            .unwrap();
        }

        h.tracker
            .handle(command(
                1,
                "/get_day_statistics 2025-03-01T00:00:00Z 2025-03-03T00:00:00+00:00",
            ))
            .await;

        let text = h.sender.texts()[0].clone();
        assert!(text.starts_with("Statistics (2025-03-01 – 2025-03-02)"));
        assert!(text.contains("• Work / Coding: 1 h 0 min"));
    }

    #[tokio::test]
    async fn test_get_day_statistics_rejects_bad_input() {
        let h = Harness::new().await;
        for args in [
            "",
            "2025-03-01T00:00:00Z",
            "yesterday today",
            "2025-03-02T00:00:00Z 2025-03-01T00:00:00Z",
        ] {
            h.tracker
                .handle(command(1, &format!("/get_day_statistics {}", args)))
                .await;
        }

        let texts = h.sender.texts();
        assert_eq!(texts.len(), 4);
        assert!(texts[0].starts_with("Usage: /get_day_statistics"));
        assert!(texts[1].starts_with("Usage: /get_day_statistics"));
        assert!(texts[2].contains("is not an RFC 3339 time"));
        assert_eq!(texts[3], "Period must end after it starts.");
    }

    #[tokio::test]
    async fn test_day_stats_routine_button() {
        let h = Harness::new().await;
        log_now(&h, "Sleep", 60).await;

        h.tracker.handle(command(1, "/test_day_stats_routine")).await;
        let token = match &h.sender.sent()[0] {
            Sent::Text {
                markup: Markup::Keyboard(keyboard),
                ..
            } => keyboard.tokens()[0].to_string(),
            other => panic!("unexpected {:?}", other),
        };
        let bounds: Vec<i64> = token
            .strip_prefix("day_stats__send_chart ")
            .unwrap()
            .split(' ')
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(bounds[1] - bounds[0], 24 * 60 * 60);

        h.tracker.handle(callback(1, 1200, &token, Utc::now())).await;
        let sent = h.sender.sent();
        match &sent[1] {
            Sent::Text { text, .. } => {
                assert!(text.starts_with("Last 24 hours ("));
                assert!(text.contains("• Sleep: 1 h 0 min"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(sent[2], Sent::Delete { message_id: 1200, .. }));
        assert!(matches!(sent[3], Sent::Answer { text: None, .. }));
    }

    #[tokio::test]
    async fn test_compare_weeks() {
        let h = Harness::new().await;
        log_now(&h, "Reading", 45).await;

        h.tracker.handle(command(1, "/analytics")).await;
        h.tracker
            .handle(callback(1, 1001, "compare_periods__this_vs_last_week", Utc::now()))
            .await;

        let text = h.sender.texts().last().unwrap().clone();
        assert!(text.starts_with("📊 This week vs last week"));
        assert!(text.contains("🆕 Reading: 45 min (new)"));
    }

    #[tokio::test]
    async fn test_menu_navigation() {
        let h = Harness::new().await;
        for token in ["analytics__day_stats", "analytics__back", "analytics__compare_periods", "compare_periods__back"] {
            h.tracker.handle(callback(1, 1001, token, Utc::now())).await;
        }
        let edits: Vec<_> = h
            .sender
            .sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(
            edits,
            vec!["Which period?", "📊 Analytics", "What should I compare?", "📊 Analytics"]
        );
    }
}
