//! Inline keyboards and reply markup.

use crate::callback::CallbackCommand;

/// A button that sends its callback token back when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, command: CallbackCommand) -> Self {
        Self {
            text: text.into(),
            data: command.to_string(),
        }
    }
}

/// Rows of inline buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row.
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    /// Append a row holding one button.
    pub fn button(self, text: impl Into<String>, command: CallbackCommand) -> Self {
        self.row(vec![InlineButton::new(text, command)])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Every callback token on the keyboard, row by row.
    pub fn tokens(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .map(|button| button.data.as_str())
            .collect()
    }
}

/// Markup sent with a new message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Markup {
    #[default]
    None,
    Keyboard(InlineKeyboard),
    /// Opens the reply interface so the user answers the prompt directly.
    ForceReply,
}

impl From<InlineKeyboard> for Markup {
    fn from(keyboard: InlineKeyboard) -> Self {
        Self::Keyboard(keyboard)
    }
}
