//! Periodic notification scheduler.
//!
//! Every tick loads all users and prompts the ones that are due. Prompts are
//! spawned so one slow chat never delays the others, and a user whose record
//! cannot be evaluated is logged and skipped.

use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use database::{user, User};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TrackerError};
use crate::shutdown::Shutdown;
use crate::tracker::Tracker;

/// A complete notification schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval_minutes: i64,
    /// First hour of the window, inclusive (UTC).
    pub morning_start_hour: u32,
    /// Last hour of the window, exclusive (UTC).
    pub evening_finish_hour: u32,
}

impl Schedule {
    /// Same-day `[morning, evening)` check.
    pub fn in_window(&self, hour: u32) -> bool {
        self.morning_start_hour <= hour && hour < self.evening_finish_hour
    }

    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.interval_minutes)
    }
}

/// Read the user's schedule; every field must be set and usable.
pub fn schedule_of(user: &User) -> Result<Schedule> {
    let (Some(interval_minutes), Some(morning_start_hour), Some(evening_finish_hour)) = (
        user.interval_minutes,
        user.morning_start_hour,
        user.evening_finish_hour,
    ) else {
        return Err(TrackerError::configuration(
            "Your schedule is incomplete. Run /start to pick an interval and hours.",
        ));
    };

    if interval_minutes <= 0 {
        return Err(TrackerError::configuration(
            "The prompt interval must be positive. Run /start to pick one.",
        ));
    }
    if morning_start_hour >= evening_finish_hour {
        return Err(TrackerError::configuration(
            "The evening hour must be later than the morning hour. Run /start to fix it.",
        ));
    }

    Ok(Schedule {
        interval_minutes,
        morning_start_hour,
        evening_finish_hour,
    })
}

/// Outcome of evaluating one user at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Disabled,
    OutsideWindow,
    /// The interval since the last prompt has not elapsed.
    TooSoon,
    Due,
}

/// Decide whether `user` should be prompted at `now`.
pub fn evaluate(user: &User, now: DateTime<Utc>) -> Result<Decision> {
    if !user.notifications_enabled {
        return Ok(Decision::Disabled);
    }

    let schedule = schedule_of(user)?;
    if !schedule.in_window(now.hour()) {
        return Ok(Decision::OutsideWindow);
    }

    match user.last_notify {
        Some(last) if now - last < schedule.interval() => Ok(Decision::TooSoon),
        _ => Ok(Decision::Due),
    }
}

/// Counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub notified: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Runs the periodic evaluation.
#[derive(Debug, Clone)]
pub struct Scheduler {
    tracker: Tracker,
    period: Duration,
}

impl Scheduler {
    pub fn new(tracker: Tracker) -> Self {
        let period = tracker.config().tick_interval;
        Self { tracker, period }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Evaluate every user once.
    ///
    /// `last_notify` is written before the prompt is spawned, so a slow
    /// delivery cannot lead to a second prompt on the next tick.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let users = user::list_users(self.tracker.pool()).await?;
        let mut report = TickReport {
            checked: users.len(),
            ..TickReport::default()
        };

        for user in users {
            match evaluate(&user, now) {
                Ok(Decision::Due) => {
                    if let Err(e) = user::set_last_notify(self.tracker.pool(), user.id, now).await {
                        warn!(user_id = user.id, "Failed to record prompt time: {}", e);
                        report.failed += 1;
                        continue;
                    }
                    self.spawn_prompt(user);
                    report.notified += 1;
                }
                Ok(decision) => {
                    debug!(user_id = user.id, ?decision, "Not prompting");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(user_id = user.id, "Skipping user: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    fn spawn_prompt(&self, user: User) {
        let tracker = self.tracker.clone();
        tokio::spawn(async move {
            if let Err(e) = tracker.send_prompt(&user).await {
                warn!(user_id = user.id, "Failed to send prompt: {}", e);
            }
        });
    }

    /// Tick until shutdown.
    pub async fn run(self, mut shutdown: Shutdown) {
        info!("Scheduler started (period {:?})", self.period);

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick(Utc::now()).await {
                        Ok(report) if report.notified > 0 || report.failed > 0 => {
                            info!(
                                notified = report.notified,
                                failed = report.failed,
                                "Scheduler tick"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!("Scheduler tick failed: {}", e),
                    }
                }
                () = shutdown.wait() => {
                    info!("Scheduler stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::handlers::testing::Harness;
    use crate::keyboard::Markup;
    use crate::picker::PROMPT_TEXT;
    use crate::sender::testing::Sent;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()
    }

    fn enabled_user(last_notify: Option<DateTime<Utc>>) -> User {
        User {
            notifications_enabled: true,
            interval_minutes: Some(30),
            morning_start_hour: Some(7),
            evening_finish_hour: Some(19),
            last_notify,
            ..User::new(1, 1)
        }
    }

    #[test]
    fn test_evaluate() {
        let now = noon();
        let minutes = chrono::Duration::minutes;

        assert_eq!(
            evaluate(&enabled_user(Some(now - minutes(10))), now).unwrap(),
            Decision::TooSoon
        );
        assert_eq!(
            evaluate(&enabled_user(Some(now - minutes(35))), now).unwrap(),
            Decision::Due
        );
        assert_eq!(
            evaluate(&enabled_user(Some(now - minutes(30))), now).unwrap(),
            Decision::Due
        );
        assert_eq!(evaluate(&enabled_user(None), now).unwrap(), Decision::Due);

        let evening = Utc.with_ymd_and_hms(2025, 3, 5, 19, 0, 0).unwrap();
        assert_eq!(
            evaluate(&enabled_user(None), evening).unwrap(),
            Decision::OutsideWindow
        );

        let disabled = User {
            notifications_enabled: false,
            ..enabled_user(None)
        };
        assert_eq!(evaluate(&disabled, now).unwrap(), Decision::Disabled);
    }

    #[test]
    fn test_incomplete_schedule_is_configuration_error() {
        let user = User {
            morning_start_hour: None,
            ..enabled_user(None)
        };
        assert!(matches!(
            evaluate(&user, noon()),
            Err(TrackerError::Configuration(_))
        ));

        let overnight = User {
            morning_start_hour: Some(22),
            evening_finish_hour: Some(6),
            ..enabled_user(None)
        };
        assert!(matches!(
            schedule_of(&overnight),
            Err(TrackerError::Configuration(_))
        ));
    }

    async fn store(h: &Harness, user: &User) {
        user::ensure_user(h.pool(), user.id, user.chat_id).await.unwrap();
        user::update_user(h.pool(), user).await.unwrap();
    }

    #[tokio::test]
    async fn test_tick_skips_until_interval_elapsed() {
        let h = Harness::new().await;
        let scheduler = Scheduler::new(h.tracker.clone());
        let now = noon();

        let recent = now - chrono::Duration::minutes(10);
        store(&h, &enabled_user(Some(recent))).await;

        let report = scheduler.tick(now).await.unwrap();
        assert_eq!(report.notified, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(h.user(1).await.last_notify, Some(recent));

        store(&h, &enabled_user(Some(now - chrono::Duration::minutes(35)))).await;
        let report = scheduler.tick(now).await.unwrap();
        assert_eq!(report.notified, 1);
        assert_eq!(h.user(1).await.last_notify, Some(now));

        let sent = h.sender.wait_for(1).await;
        assert!(matches!(
            &sent[0],
            Sent::Text { chat_id: 1, text, markup: Markup::Keyboard(_), .. } if text.starts_with(PROMPT_TEXT)
        ));

        // Same instant again: too soon.
        assert_eq!(scheduler.tick(now).await.unwrap().notified, 0);
    }

    #[tokio::test]
    async fn test_tick_isolates_misconfigured_users() {
        let h = Harness::new().await;
        let scheduler = Scheduler::new(h.tracker.clone());

        let broken = User {
            interval_minutes: None,
            ..User {
                id: 2,
                chat_id: 2,
                ..enabled_user(None)
            }
        };
        store(&h, &broken).await;
        store(&h, &enabled_user(None)).await;

        let report = scheduler.tick(noon()).await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.notified, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let h = Harness::new().await;
        let scheduler = Scheduler::new(h.tracker.clone()).with_period(Duration::from_millis(10));
        let shutdown = h.trigger.subscribe();

        let task = tokio::spawn(scheduler.run(shutdown));
        tokio::time::sleep(Duration::from_millis(30)).await;
        h.trigger.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
    }
}
