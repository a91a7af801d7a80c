//! Message sender trait and implementations.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use database::{ChatId, MessageId};

use crate::error::TrackerError;
use crate::keyboard::{InlineKeyboard, Markup};

/// Outbound side of the chat transport.
///
/// Abstracted to support different transports (Telegram, tests, etc.)
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message and return its id.
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Markup,
    ) -> Result<MessageId, TrackerError>;

    /// Replace the text of a sent message.
    ///
    /// `None` removes any inline keyboard.
    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<(), TrackerError>;

    /// Delete a message.
    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId)
        -> Result<(), TrackerError>;

    /// Acknowledge a button press, optionally with a transient notice.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), TrackerError>;

    /// Upload a file.
    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<MessageId, TrackerError>;

    /// Upload an image.
    async fn send_photo(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId, TrackerError>;

    /// Fetch the contents of a file the user uploaded.
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, TrackerError>;
}

/// A no-op message sender that discards all messages.
#[derive(Debug, Default)]
pub struct NoOpSender {
    next_id: AtomicI64,
}

impl NoOpSender {
    fn next_id(&self) -> MessageId {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl MessageSender for NoOpSender {
    async fn send_text(
        &self,
        _chat_id: ChatId,
        _text: &str,
        _markup: Markup,
    ) -> Result<MessageId, TrackerError> {
        Ok(self.next_id())
    }

    async fn edit_text(
        &self,
        _chat_id: ChatId,
        _message_id: MessageId,
        _text: &str,
        _keyboard: Option<InlineKeyboard>,
    ) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn delete_message(
        &self,
        _chat_id: ChatId,
        _message_id: MessageId,
    ) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn answer_callback(
        &self,
        _callback_id: &str,
        _text: Option<&str>,
    ) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn send_document(
        &self,
        _chat_id: ChatId,
        _file_name: &str,
        _bytes: Vec<u8>,
        _caption: Option<&str>,
    ) -> Result<MessageId, TrackerError> {
        Ok(self.next_id())
    }

    async fn send_photo(
        &self,
        _chat_id: ChatId,
        _file_name: &str,
        _bytes: Vec<u8>,
        _caption: Option<&str>,
        _keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId, TrackerError> {
        Ok(self.next_id())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, TrackerError> {
        Err(TrackerError::Transport(format!(
            "no-op sender cannot download {}",
            file_id
        )))
    }
}

/// A logging message sender for debugging that logs all operations.
#[derive(Debug, Default)]
pub struct LoggingSender {
    inner: NoOpSender,
}

#[async_trait]
impl MessageSender for LoggingSender {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Markup,
    ) -> Result<MessageId, TrackerError> {
        let buttons = match &markup {
            Markup::Keyboard(keyboard) => keyboard.tokens().len(),
            _ => 0,
        };
        tracing::info!("[chat {}] Sending message ({} buttons): {}", chat_id, buttons, text);
        self.inner.send_text(chat_id, text, markup).await
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<(), TrackerError> {
        tracing::info!("[chat {}] Editing message {}: {}", chat_id, message_id, text);
        self.inner.edit_text(chat_id, message_id, text, keyboard).await
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TrackerError> {
        tracing::info!("[chat {}] Deleting message {}", chat_id, message_id);
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), TrackerError> {
        tracing::info!("Answering callback {}: {:?}", callback_id, text);
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<MessageId, TrackerError> {
        tracing::info!("[chat {}] Sending document {} ({} bytes)", chat_id, file_name, bytes.len());
        self.inner.send_document(chat_id, file_name, bytes, caption).await
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId, TrackerError> {
        tracing::info!("[chat {}] Sending photo {} ({} bytes)", chat_id, file_name, bytes.len());
        self.inner
            .send_photo(chat_id, file_name, bytes, caption, keyboard)
            .await
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, TrackerError> {
        self.inner.download_file(file_id).await
    }
}
