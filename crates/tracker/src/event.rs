//! Transport-neutral inbound chat events.

use chrono::{DateTime, Utc};
use database::{ChatId, MessageId, UserId};

/// One inbound chat event, already attributed to a user and chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: UserId,
    pub chat_id: ChatId,
    /// The message that carried the event. For callbacks this is the message
    /// holding the keyboard.
    pub message_id: MessageId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/name args`
    Command { name: String, args: String },
    /// Ordinary text, routed to a waiting interactive command.
    Text(String),
    /// An uploaded file.
    Document {
        file_id: String,
        file_name: Option<String>,
    },
    /// An inline button press.
    Callback {
        id: String,
        data: String,
        /// When the keyboard message was sent; prompts log against this time.
        sent_at: DateTime<Utc>,
    },
}

impl InboundEvent {
    /// Short label for logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Command { .. } => "command",
            EventKind::Text(_) => "text",
            EventKind::Document { .. } => "document",
            EventKind::Callback { .. } => "callback",
        }
    }
}
