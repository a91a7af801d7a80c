//! Slash commands.

use std::str::FromStr;

use crate::error::TrackerError;

/// A slash command understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    RegisterNewActivity,
    StartNotify,
    StopNotify,
    TestNotify,
    MuteActivity,
    UnmuteActivity,
    DeleteActivity,
    ExportActivities,
    ImportActivities,
    Analytics,
    GetDayStatistics,
    TestDayStatsRoutine,
    Cancel,
}

impl Command {
    /// Every command, in menu order.
    pub const ALL: [Command; 14] = [
        Command::Start,
        Command::RegisterNewActivity,
        Command::StartNotify,
        Command::StopNotify,
        Command::TestNotify,
        Command::MuteActivity,
        Command::UnmuteActivity,
        Command::DeleteActivity,
        Command::ExportActivities,
        Command::ImportActivities,
        Command::Analytics,
        Command::GetDayStatistics,
        Command::TestDayStatsRoutine,
        Command::Cancel,
    ];

    /// Name without the leading slash.
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::RegisterNewActivity => "register_new_activity",
            Self::StartNotify => "start_notify",
            Self::StopNotify => "stop_notify",
            Self::TestNotify => "test_notify",
            Self::MuteActivity => "mute_activity",
            Self::UnmuteActivity => "unmute_activity",
            Self::DeleteActivity => "delete_activity",
            Self::ExportActivities => "export_activities",
            Self::ImportActivities => "import_activities",
            Self::Analytics => "analytics",
            Self::GetDayStatistics => "get_day_statistics",
            Self::TestDayStatsRoutine => "test_day_stats_routine",
            Self::Cancel => "cancel",
        }
    }

    /// Menu description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Start => "Set up the notification schedule",
            Self::RegisterNewActivity => "Add an activity, e.g. Work / Coding",
            Self::StartNotify => "Start receiving prompts",
            Self::StopNotify => "Stop receiving prompts",
            Self::TestNotify => "Send a prompt right now",
            Self::MuteActivity => "Hide an activity from prompts",
            Self::UnmuteActivity => "Show a muted activity again",
            Self::DeleteActivity => "Delete an activity with everything inside",
            Self::ExportActivities => "Download your activities as YAML",
            Self::ImportActivities => "Merge activities from a YAML file",
            Self::Analytics => "Statistics and period comparison",
            Self::GetDayStatistics => "Statistics between two RFC 3339 times",
            Self::TestDayStatsRoutine => "Send the end-of-day chart button now",
            Self::Cancel => "Cancel the command waiting for your answer",
        }
    }
}

impl FromStr for Command {
    type Err = TrackerError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim_start_matches('/');
        Self::ALL
            .into_iter()
            .find(|command| command.name() == name)
            .ok_or_else(|| TrackerError::validation(format!("Unknown command /{}.", name)))
    }
}
