//! Callback tokens carried by inline buttons.
//!
//! A token is a whitespace-separated string: the first word selects the
//! handler, the remaining words are integer arguments.

use std::fmt;
use std::str::FromStr;

use database::ActivityId;

use crate::error::TrackerError;
use crate::stats::PeriodPreset;

/// A parsed callback token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackCommand {
    /// Answer to a prompt, or drill into a non-leaf.
    ActivityLog { activity_id: ActivityId, minutes: i64 },
    RegisterNewActivity,
    RefreshActivities,

    SetTimerMinutes(i64),
    SetMorningStartHour(u32),
    SetEveningFinishHour(u32),
    EnableNotifications,
    DisableNotifications,

    Mute(ActivityId),
    MuteCancel,
    MuteRefresh,
    Unmute(ActivityId),
    UnmuteCancel,
    UnmuteRefresh,
    /// Show the children of a node in the delete picker.
    DeleteOpen(ActivityId),
    /// Delete a node with its whole subtree.
    Delete(ActivityId),
    DeleteCancel,
    DeleteRefresh,

    AnalyticsDayStats,
    AnalyticsComparePeriods,
    AnalyticsBack,
    DayStats(PeriodPreset),
    /// Re-render a chart for an explicit `[start, end)` in unix seconds.
    RefreshChart { start: i64, end: i64 },
    /// End-of-day button: chart for `[start, end)`, then drop the button.
    SendDayChart { start: i64, end: i64 },
    CompareWeeks,
    CompareMonths,
    CompareBack,
}

impl CallbackCommand {
    /// First word of the token.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ActivityLog { .. } => "activity_log",
            Self::RegisterNewActivity => "register_new_activity",
            Self::RefreshActivities => "refresh_activities",
            Self::SetTimerMinutes(_) => "start__set_timer_minutes",
            Self::SetMorningStartHour(_) => "start__schedule_morning_start_hour",
            Self::SetEveningFinishHour(_) => "start__schedule_evening_finish_hour",
            Self::EnableNotifications => "start__enable_notifications",
            Self::DisableNotifications => "start__disable_notifications",
            Self::Mute(_) => "mute_activity__mute",
            Self::MuteCancel => "mute_activity__cancel",
            Self::MuteRefresh => "mute_activity__refresh",
            Self::Unmute(_) => "unmute_activity__unmute",
            Self::UnmuteCancel => "unmute_activity__cancel",
            Self::UnmuteRefresh => "unmute_activity__refresh",
            Self::DeleteOpen(_) => "delete_activity__open",
            Self::Delete(_) => "delete_activity__delete",
            Self::DeleteCancel => "delete_activity__cancel",
            Self::DeleteRefresh => "delete_activity__refresh",
            Self::AnalyticsDayStats => "analytics__day_stats",
            Self::AnalyticsComparePeriods => "analytics__compare_periods",
            Self::AnalyticsBack => "analytics__back",
            Self::DayStats(PeriodPreset::Today) => "day_stats__today",
            Self::DayStats(PeriodPreset::Yesterday) => "day_stats__yesterday",
            Self::DayStats(PeriodPreset::ThisWeek) => "day_stats__this_week",
            Self::DayStats(PeriodPreset::LastWeek) => "day_stats__last_week",
            Self::DayStats(PeriodPreset::ThisMonth) => "day_stats__this_month",
            Self::DayStats(PeriodPreset::LastMonth) => "day_stats__last_month",
            Self::RefreshChart { .. } => "day_stats__refresh_chart",
            Self::SendDayChart { .. } => "day_stats__send_chart",
            Self::CompareWeeks => "compare_periods__this_vs_last_week",
            Self::CompareMonths => "compare_periods__this_vs_last_month",
            Self::CompareBack => "compare_periods__back",
        }
    }
}

impl fmt::Display for CallbackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        match *self {
            Self::ActivityLog {
                activity_id,
                minutes,
            } => write!(f, " {} {}", activity_id, minutes),
            Self::SetTimerMinutes(minutes) => write!(f, " {}", minutes),
            Self::SetMorningStartHour(hour) | Self::SetEveningFinishHour(hour) => {
                write!(f, " {}", hour)
            }
            Self::Mute(id)
            | Self::Unmute(id)
            | Self::DeleteOpen(id)
            | Self::Delete(id) => write!(f, " {}", id),
            Self::RefreshChart { start, end } | Self::SendDayChart { start, end } => {
                write!(f, " {} {}", start, end)
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for CallbackCommand {
    type Err = TrackerError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut words = data.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| TrackerError::validation("Empty button data."))?;
        let args = Args {
            name,
            values: words.collect(),
        };

        let command = match name {
            "activity_log" => {
                args.expect(2)?;
                Self::ActivityLog {
                    activity_id: args.int(0)?,
                    minutes: args.int(1)?,
                }
            }
            "register_new_activity" => args.none(Self::RegisterNewActivity)?,
            "refresh_activities" => args.none(Self::RefreshActivities)?,
            "start__set_timer_minutes" => {
                args.expect(1)?;
                Self::SetTimerMinutes(args.int(0)?)
            }
            "start__schedule_morning_start_hour" => {
                args.expect(1)?;
                Self::SetMorningStartHour(args.hour(0)?)
            }
            "start__schedule_evening_finish_hour" => {
                args.expect(1)?;
                Self::SetEveningFinishHour(args.hour(0)?)
            }
            "start__enable_notifications" => args.none(Self::EnableNotifications)?,
            "start__disable_notifications" => args.none(Self::DisableNotifications)?,
            "mute_activity__mute" => {
                args.expect(1)?;
                Self::Mute(args.int(0)?)
            }
            "mute_activity__cancel" => args.none(Self::MuteCancel)?,
            "mute_activity__refresh" => args.none(Self::MuteRefresh)?,
            "unmute_activity__unmute" => {
                args.expect(1)?;
                Self::Unmute(args.int(0)?)
            }
            "unmute_activity__cancel" => args.none(Self::UnmuteCancel)?,
            "unmute_activity__refresh" => args.none(Self::UnmuteRefresh)?,
            "delete_activity__open" => {
                args.expect(1)?;
                Self::DeleteOpen(args.int(0)?)
            }
            "delete_activity__delete" => {
                args.expect(1)?;
                Self::Delete(args.int(0)?)
            }
            "delete_activity__cancel" => args.none(Self::DeleteCancel)?,
            "delete_activity__refresh" => args.none(Self::DeleteRefresh)?,
            "analytics__day_stats" => args.none(Self::AnalyticsDayStats)?,
            "analytics__compare_periods" => args.none(Self::AnalyticsComparePeriods)?,
            "analytics__back" => args.none(Self::AnalyticsBack)?,
            "day_stats__today" => args.none(Self::DayStats(PeriodPreset::Today))?,
            "day_stats__yesterday" => args.none(Self::DayStats(PeriodPreset::Yesterday))?,
            "day_stats__this_week" => args.none(Self::DayStats(PeriodPreset::ThisWeek))?,
            "day_stats__last_week" => args.none(Self::DayStats(PeriodPreset::LastWeek))?,
            "day_stats__this_month" => args.none(Self::DayStats(PeriodPreset::ThisMonth))?,
            "day_stats__last_month" => args.none(Self::DayStats(PeriodPreset::LastMonth))?,
            "day_stats__refresh_chart" => {
                let (start, end) = args.interval()?;
                Self::RefreshChart { start, end }
            }
            "day_stats__send_chart" => {
                let (start, end) = args.interval()?;
                Self::SendDayChart { start, end }
            }
            "compare_periods__this_vs_last_week" => args.none(Self::CompareWeeks)?,
            "compare_periods__this_vs_last_month" => args.none(Self::CompareMonths)?,
            "compare_periods__back" => args.none(Self::CompareBack)?,
            other => {
                return Err(TrackerError::validation(format!(
                    "Unknown button \"{}\".",
                    other
                )))
            }
        };

        Ok(command)
    }
}

struct Args<'a> {
    name: &'a str,
    values: Vec<&'a str>,
}

impl Args<'_> {
    fn expect(&self, count: usize) -> Result<(), TrackerError> {
        if self.values.len() != count {
            return Err(TrackerError::validation(format!(
                "Button \"{}\" expects {} argument(s), got {}.",
                self.name,
                count,
                self.values.len()
            )));
        }
        Ok(())
    }

    fn none(&self, command: CallbackCommand) -> Result<CallbackCommand, TrackerError> {
        self.expect(0)?;
        Ok(command)
    }

    fn int(&self, index: usize) -> Result<i64, TrackerError> {
        let raw = self.values.get(index).copied().unwrap_or_default();
        raw.parse().map_err(|_| {
            TrackerError::validation(format!(
                "Button \"{}\" has a malformed argument \"{}\".",
                self.name, raw
            ))
        })
    }

    fn interval(&self) -> Result<(i64, i64), TrackerError> {
        self.expect(2)?;
        let (start, end) = (self.int(0)?, self.int(1)?);
        if start >= end {
            return Err(TrackerError::validation("Chart interval is empty."));
        }
        Ok((start, end))
    }

    fn hour(&self, index: usize) -> Result<u32, TrackerError> {
        let value = self.int(index)?;
        u32::try_from(value)
            .ok()
            .filter(|hour| *hour < 24)
            .ok_or_else(|| TrackerError::validation(format!("{} is not an hour of the day.", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> Result<CallbackCommand, TrackerError> {
        data.parse()
    }

    #[test]
    fn test_parse_activity_log() {
        assert_eq!(
            parse("activity_log 12 30").unwrap(),
            CallbackCommand::ActivityLog {
                activity_id: 12,
                minutes: 30
            }
        );
    }

    #[test]
    fn test_parse_extra_whitespace() {
        assert_eq!(
            parse("  mute_activity__mute   4 ").unwrap(),
            CallbackCommand::Mute(4)
        );
    }

    #[test]
    fn test_tokens_format_as_they_parse() {
        let commands = [
            CallbackCommand::ActivityLog {
                activity_id: -3,
                minutes: 20,
            },
            CallbackCommand::SetEveningFinishHour(0),
            CallbackCommand::DeleteOpen(9),
            CallbackCommand::DayStats(PeriodPreset::LastWeek),
            CallbackCommand::RefreshChart {
                start: 1_700_000_000,
                end: 1_700_086_400,
            },
            CallbackCommand::SendDayChart {
                start: 1_700_000_000,
                end: 1_700_086_400,
            },
            CallbackCommand::CompareBack,
        ];
        for command in commands {
            assert_eq!(parse(&command.to_string()).unwrap(), command);
        }
        assert_eq!(
            CallbackCommand::SetTimerMinutes(30).to_string(),
            "start__set_timer_minutes 30"
        );
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(matches!(parse(""), Err(TrackerError::Validation(_))));
        assert!(matches!(parse("no_such_button"), Err(TrackerError::Validation(_))));
        assert!(matches!(parse("activity_log 1"), Err(TrackerError::Validation(_))));
        assert!(matches!(parse("activity_log one 10"), Err(TrackerError::Validation(_))));
        assert!(matches!(parse("mute_activity__cancel 3"), Err(TrackerError::Validation(_))));
        assert!(matches!(
            parse("start__schedule_morning_start_hour 24"),
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            parse("day_stats__refresh_chart 200 100"),
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            parse("day_stats__send_chart 100"),
            Err(TrackerError::Validation(_))
        ));
    }
}
