//! Telegram-backed message sender.

use async_trait::async_trait;
use database::{ChatId, MessageId};
use telegram_client::{
    ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, ReplyMarkup, TelegramClient,
    TelegramError,
};
use tracing::debug;
use tracker::{InlineKeyboard, Markup, MessageSender, TrackerError};

/// Sends tracker output through the Bot API.
#[derive(Clone)]
pub struct TelegramSender {
    client: TelegramClient,
}

impl TelegramSender {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }
}

fn transport(e: TelegramError) -> TrackerError {
    TrackerError::Transport(e.to_string())
}

pub(crate) fn keyboard_markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: keyboard
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|button| InlineKeyboardButton::callback(button.text, button.data))
                    .collect()
            })
            .collect(),
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Markup,
    ) -> Result<MessageId, TrackerError> {
        let message = match markup {
            Markup::None => self.client.send_text(chat_id, text).await,
            Markup::Keyboard(keyboard) => {
                let markup = ReplyMarkup::InlineKeyboard(keyboard_markup(keyboard));
                self.client.send_with_markup(chat_id, text, markup).await
            }
            Markup::ForceReply => {
                let markup = ReplyMarkup::ForceReply(ForceReply::default());
                self.client.send_with_markup(chat_id, text, markup).await
            }
        }
        .map_err(transport)?;
        Ok(message.message_id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<(), TrackerError> {
        match self
            .client
            .edit_message_text(chat_id, message_id, text, keyboard.map(keyboard_markup))
            .await
        {
            Err(e) if e.is_not_modified() => {
                debug!("Message {} already up to date", message_id);
                Ok(())
            }
            result => result.map_err(transport),
        }
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TrackerError> {
        self.client
            .delete_message(chat_id, message_id)
            .await
            .map_err(transport)
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), TrackerError> {
        self.client
            .answer_callback_query(callback_id, text)
            .await
            .map_err(transport)
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<MessageId, TrackerError> {
        let message = self
            .client
            .send_document(chat_id, file_name, bytes, caption)
            .await
            .map_err(transport)?;
        Ok(message.message_id)
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId, TrackerError> {
        let message = self
            .client
            .send_photo(chat_id, file_name, bytes, caption, keyboard.map(keyboard_markup))
            .await
            .map_err(transport)?;
        Ok(message.message_id)
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, TrackerError> {
        self.client.download_file(file_id).await.map_err(transport)
    }
}
