//! Error types for tracker operations.

use std::time::Duration;

use database::{DatabaseError, UserId};
use thiserror::Error;

/// Errors that can occur while handling chat events or scheduled work.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A user or activity lookup missed.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Required settings are missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed input: callback tokens, paths, files, documents.
    #[error("validation error: {0}")]
    Validation(String),

    /// The chat transport failed to deliver.
    #[error("transport error: {0}")]
    Transport(String),

    /// A persistence operation failed.
    #[error("storage error: {0}")]
    Storage(#[source] DatabaseError),

    /// Chart generation failed.
    #[error("chart rendering failed: {0}")]
    Render(String),

    /// The user already has an interactive command in flight.
    #[error("user {0} is already executing a command")]
    Busy(UserId),

    /// The interactive command waited too long for input.
    #[error("no input received within {0:?}")]
    InputTimeout(Duration),

    /// The interactive command was cancelled by the user or by shutdown.
    #[error("interactive command cancelled")]
    Cancelled,
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Short explanation to show in the chat.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { entity: "User", .. } => {
                "I don't know you yet. Send /start to set things up.".to_string()
            }
            Self::NotFound { .. } => {
                "This activity no longer exists. Refresh the list and try again.".to_string()
            }
            Self::Configuration(message) => format!("⚙️ {}", message),
            Self::Validation(message) => message.clone(),
            Self::Transport(_) => "Couldn't deliver the message, please try again.".to_string(),
            Self::Storage(_) => "Something went wrong while saving your data.".to_string(),
            Self::Render(_) => "Couldn't draw the chart.".to_string(),
            Self::Busy(_) => "You're already executing some command".to_string(),
            Self::InputTimeout(_) => {
                "No answer received in time, the command was cancelled.".to_string()
            }
            Self::Cancelled => "Command cancelled.".to_string(),
        }
    }

    /// Whether the failure is caused by the user rather than the system.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Configuration(_)
                | Self::Validation(_)
                | Self::Busy(_)
                | Self::InputTimeout(_)
                | Self::Cancelled
        )
    }
}

impl From<DatabaseError> for TrackerError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => Self::NotFound { entity, id },
            DatabaseError::ForeignParent { parent_id, .. } => Self::not_found("Activity", parent_id),
            other => Self::Storage(other),
        }
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_not_found_maps_to_not_found() {
        let err: TrackerError = DatabaseError::NotFound {
            entity: "Activity",
            id: "7".to_string(),
        }
        .into();
        assert!(matches!(err, TrackerError::NotFound { entity: "Activity", .. }));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_storage_errors_are_not_user_errors() {
        let err: TrackerError = DatabaseError::Sqlx(sqlx::Error::PoolClosed).into();
        assert!(matches!(err, TrackerError::Storage(_)));
        assert!(!err.is_user_error());
        assert_eq!(err.user_message(), "Something went wrong while saving your data.");
    }

    #[test]
    fn test_busy_message() {
        assert_eq!(
            TrackerError::Busy(1).user_message(),
            "You're already executing some command"
        );
    }
}
