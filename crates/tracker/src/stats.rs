//! Duration aggregation, period presets and period comparison.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use database::activity_log;
use database::{ActivityFilter, ActivityId, UserId, ROOT_PARENT_ID};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{Result, TrackerError};
use crate::tree::{ActivityForest, ActivityRoute};

/// Number of rows shown in a comparison message.
pub const TOP_CHANGES: usize = 5;

/// Half-open `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(TrackerError::validation("Period must end after it starts."));
        }
        Ok(Self { start, end })
    }

    /// Build from unix seconds, as carried by chart buttons.
    pub fn from_unix(start: i64, end: i64) -> Result<Self> {
        let convert = |secs: i64| {
            Utc.timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| TrackerError::validation(format!("{} is not a valid timestamp.", secs)))
        };
        Self::new(convert(start)?, convert(end)?)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// `2025-03-03 – 2025-03-09` style label, end day inclusive.
    pub fn label(&self) -> String {
        let first = self.start.date_naive();
        let last = (self.end - chrono::Duration::seconds(1)).date_naive();
        if first == last {
            first.format("%Y-%m-%d").to_string()
        } else {
            format!("{} – {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d"))
        }
    }
}

/// Named intervals offered by the analytics menu.
///
/// Weeks start on Monday; every boundary is UTC midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodPreset {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
}

impl PeriodPreset {
    pub const ALL: [PeriodPreset; 6] = [
        Self::Today,
        Self::Yesterday,
        Self::ThisWeek,
        Self::LastWeek,
        Self::ThisMonth,
        Self::LastMonth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::ThisWeek => "This week",
            Self::LastWeek => "Last week",
            Self::ThisMonth => "This month",
            Self::LastMonth => "Last month",
        }
    }

    /// The interval this preset covers at `now`.
    pub fn period(self, now: DateTime<Utc>) -> Period {
        let today = now.date_naive();
        let week_start = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
        let month_start = today - Days::new(u64::from(today.day0()));

        let (start, end) = match self {
            Self::Today => (today, today + Days::new(1)),
            Self::Yesterday => (today - Days::new(1), today),
            Self::ThisWeek => (week_start, week_start + Days::new(7)),
            Self::LastWeek => (week_start - Days::new(7), week_start),
            Self::ThisMonth => (month_start, month_start + Months::new(1)),
            Self::LastMonth => (month_start - Months::new(1), month_start),
        };

        Period {
            start: midnight(start),
            end: midnight(end),
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Minutes per activity logged in `period`.
pub async fn durations(
    pool: &SqlitePool,
    user_id: UserId,
    period: Period,
) -> Result<HashMap<ActivityId, i64>> {
    Ok(activity_log::sum_minutes_by_activity(pool, user_id, period.start, period.end).await?)
}

/// One node of the chart payload. Only leaves carry a duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartNode {
    pub id: ActivityId,
    pub name: String,
    pub parent_id: Option<ActivityId>,
    pub duration: Option<i64>,
}

/// Join durations onto the forest, parents before children.
pub fn chart_nodes(forest: &ActivityForest, durations: &HashMap<ActivityId, i64>) -> Vec<ChartNode> {
    let mut nodes = Vec::with_capacity(forest.len());
    let mut pending: Vec<_> = forest.roots().collect();
    pending.reverse();

    while let Some(activity) = pending.pop() {
        nodes.push(ChartNode {
            id: activity.id,
            name: activity.name.clone(),
            parent_id: (activity.parent_id != ROOT_PARENT_ID).then_some(activity.parent_id),
            duration: activity
                .is_leaf
                .then(|| durations.get(&activity.id).copied().unwrap_or(0)),
        });
        if !activity.is_leaf {
            let children: Vec<_> = forest.children(activity.id).collect();
            pending.extend(children.into_iter().rev());
        }
    }

    nodes
}

/// Chart payload for the user's whole tree over `period`.
pub async fn chart_data(pool: &SqlitePool, user_id: UserId, period: Period) -> Result<Vec<ChartNode>> {
    let forest = ActivityForest::load(pool, user_id, ActivityFilter::all()).await?;
    let durations = durations(pool, user_id, period).await?;
    Ok(chart_nodes(&forest, &durations))
}

/// Change of one activity between two periods.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityComparison {
    /// Full route name.
    pub name: String,
    pub period1_minutes: i64,
    pub period2_minutes: i64,
    /// `period1_minutes - period2_minutes`.
    pub difference: i64,
    /// Relative change. `100.0` marks an activity absent from period 2,
    /// `-100.0` one absent from period 1; see [`Self::is_new`] and
    /// [`Self::is_gone`].
    pub percent_change: f64,
}

impl ActivityComparison {
    pub fn is_new(&self) -> bool {
        self.period2_minutes == 0 && self.period1_minutes > 0
    }

    pub fn is_gone(&self) -> bool {
        self.period1_minutes == 0 && self.period2_minutes > 0
    }
}

/// Compare two duration maps per leaf route.
///
/// Period 1 is the current one. Activities with no time in either period
/// are skipped. Rows are ordered by absolute difference, largest first.
pub fn compare(
    routes: &[ActivityRoute],
    period1: &HashMap<ActivityId, i64>,
    period2: &HashMap<ActivityId, i64>,
) -> Vec<ActivityComparison> {
    let mut rows: Vec<ActivityComparison> = routes
        .iter()
        .filter_map(|route| {
            let p1 = period1.get(&route.leaf_id).copied().unwrap_or(0);
            let p2 = period2.get(&route.leaf_id).copied().unwrap_or(0);
            if p1 == 0 && p2 == 0 {
                return None;
            }
            let percent_change = if p2 == 0 {
                100.0
            } else if p1 == 0 {
                -100.0
            } else {
                (p1 - p2) as f64 / p2 as f64 * 100.0
            };
            Some(ActivityComparison {
                name: route.name.clone(),
                period1_minutes: p1,
                period2_minutes: p2,
                difference: p1 - p2,
                percent_change,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.difference
            .abs()
            .cmp(&a.difference.abs())
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

/// Two periods and the per-activity changes between them.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodComparison {
    pub current: Period,
    pub previous: Period,
    pub rows: Vec<ActivityComparison>,
}

impl PeriodComparison {
    pub fn current_total(&self) -> i64 {
        self.rows.iter().map(|row| row.period1_minutes).sum()
    }

    pub fn previous_total(&self) -> i64 {
        self.rows.iter().map(|row| row.period2_minutes).sum()
    }
}

pub async fn compare_periods(
    pool: &SqlitePool,
    user_id: UserId,
    current: Period,
    previous: Period,
) -> Result<PeriodComparison> {
    let forest = ActivityForest::load(pool, user_id, ActivityFilter::all()).await?;
    let p1 = durations(pool, user_id, current).await?;
    let p2 = durations(pool, user_id, previous).await?;
    Ok(PeriodComparison {
        current,
        previous,
        rows: compare(&forest.routes(), &p1, &p2),
    })
}

/// `"2 h 5 min"`, or `"40 min"` under an hour.
pub fn format_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    if minutes < 60 {
        format!("{}{} min", sign, minutes)
    } else {
        format!("{}{} h {} min", sign, minutes / 60, minutes % 60)
    }
}

pub fn format_comparison(comparison: &PeriodComparison, title: &str) -> String {
    let mut text = format!("📊 {}\n", title);
    if comparison.rows.is_empty() {
        text.push_str("\nNo activity logged in either period.");
        return text;
    }

    let current = comparison.current_total();
    let previous = comparison.previous_total();
    let delta_hours = (current - previous) as f64 / 60.0;
    let _ = writeln!(
        text,
        "Total: {} vs {} ({:+.1} h)",
        format_minutes(current),
        format_minutes(previous),
        delta_hours
    );

    text.push_str("\nTop changes:");
    for row in comparison.rows.iter().take(TOP_CHANGES) {
        let line = if row.is_new() {
            format!("🆕 {}: {} (new)", row.name, format_minutes(row.period1_minutes))
        } else if row.is_gone() {
            format!("💤 {}: {} (gone)", row.name, format_minutes(row.period2_minutes))
        } else {
            let icon = match row.difference.signum() {
                1 => "📈",
                -1 => "📉",
                _ => "➖",
            };
            format!(
                "{} {}: {} vs {} ({:+.0}%)",
                icon,
                row.name,
                format_minutes(row.period1_minutes),
                format_minutes(row.period2_minutes),
                row.percent_change
            )
        };
        text.push('\n');
        text.push_str(&line);
    }
    text
}

/// Text version of a chart: minutes per route, largest first.
pub fn format_breakdown(
    routes: &[ActivityRoute],
    durations: &HashMap<ActivityId, i64>,
    title: &str,
) -> String {
    let mut rows: Vec<(&str, i64)> = routes
        .iter()
        .filter_map(|route| {
            let minutes = durations.get(&route.leaf_id).copied().unwrap_or(0);
            (minutes > 0).then_some((route.name.as_str(), minutes))
        })
        .collect();

    if rows.is_empty() {
        return format!("{}\n\nNothing logged in this period.", title);
    }

    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let total: i64 = rows.iter().map(|(_, minutes)| minutes).sum();

    let mut text = format!("{}\nTotal: {}\n", title, format_minutes(total));
    for (name, minutes) in rows {
        let _ = write!(text, "\n• {}: {}", name, format_minutes(minutes));
    }
    text
}
