//! Bot API HTTP client.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TelegramConfig;
use crate::error::TelegramError;
use crate::types::{
    AnswerCallbackParams, BotCommand, DeleteMessageParams, EditMessageTextParams, File,
    GetFileParams, GetUpdatesParams, InlineKeyboardMarkup, Message, ReplyMarkup,
    SendMessageParams, SetMyCommandsParams, Update, User,
};

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i32>,
}

/// Extra time granted to a long poll on top of the server-side timeout.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Client for the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    config: TelegramConfig,
}

impl TelegramClient {
    /// Build a client and verify the token with `getMe`.
    pub async fn connect(config: TelegramConfig) -> Result<Self, TelegramError> {
        let client = Self::new(config)?;
        let me = client.get_me().await?;
        info!(
            "Connected to Bot API as @{}",
            me.username.as_deref().unwrap_or(&me.first_name)
        );
        Ok(client)
    }

    /// Build a client without contacting the API.
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramError> {
        if config.token.trim().is_empty() {
            return Err(TelegramError::Config("bot token is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(TelegramError::Http)?;

        Ok(Self { http, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    /// Get information about the bot itself.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call::<(), _>("getMe", None).await
    }

    /// Long-poll for updates starting at `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesParams::new(offset, self.config.poll_timeout.as_secs());
        let timeout = self.config.poll_timeout + POLL_GRACE;
        self.call_with_timeout("getUpdates", Some(params), timeout)
            .await
    }

    /// Send a message with the full parameter set.
    pub async fn send_message(&self, params: SendMessageParams) -> Result<Message, TelegramError> {
        self.call("sendMessage", Some(params)).await
    }

    /// Send a plain text message.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        self.send_message(SendMessageParams::text(chat_id, text))
            .await
    }

    /// Send a text message with reply markup.
    pub async fn send_with_markup(
        &self,
        chat_id: i64,
        text: &str,
        markup: ReplyMarkup,
    ) -> Result<Message, TelegramError> {
        self.send_message(SendMessageParams::text(chat_id, text).with_markup(markup))
            .await
    }

    /// Replace the text (and optionally the keyboard) of a sent message.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let params = EditMessageTextParams {
            chat_id,
            message_id,
            text: text.to_string(),
            reply_markup: keyboard,
        };
        // editMessageText answers with the message or `true`
        let _: serde_json::Value = self.call("editMessageText", Some(params)).await?;
        Ok(())
    }

    /// Delete a message.
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError> {
        let params = DeleteMessageParams {
            chat_id,
            message_id,
        };
        let _: bool = self.call("deleteMessage", Some(params)).await?;
        Ok(())
    }

    /// Acknowledge a callback query so the client stops its spinner.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), TelegramError> {
        let params = AnswerCallbackParams {
            callback_query_id: callback_query_id.to_string(),
            text: text.map(str::to_string),
        };
        let _: bool = self.call("answerCallbackQuery", Some(params)).await?;
        Ok(())
    }

    /// Upload a file as a document.
    pub async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<Message, TelegramError> {
        self.upload("sendDocument", "document", chat_id, file_name, bytes, caption, None)
            .await
    }

    /// Upload an image as a photo, optionally with an inline keyboard.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        let markup = keyboard.map(ReplyMarkup::InlineKeyboard);
        self.upload("sendPhoto", "photo", chat_id, file_name, bytes, caption, markup.as_ref())
            .await
    }

    /// Resolve a file id to a downloadable path.
    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        let params = GetFileParams {
            file_id: file_id.to_string(),
        };
        self.call("getFile", Some(params)).await
    }

    /// Download the contents of a file by id.
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, TelegramError> {
        let file = self.get_file(file_id).await?;
        let path = file
            .file_path
            .ok_or_else(|| TelegramError::MissingResult(format!("file_path of {}", file_id)))?;

        let url = self.config.file_url(&path);
        debug!("Downloading file {}", file_id);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelegramError::Api {
                code: i32::from(status.as_u16()),
                description: format!("file download failed: HTTP {}", status),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Publish the command menu.
    pub async fn set_my_commands(&self, commands: Vec<BotCommand>) -> Result<(), TelegramError> {
        let params = SetMyCommandsParams { commands };
        let _: bool = self.call("setMyCommands", Some(params)).await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn upload(
        &self,
        method: &str,
        field: &str,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
        markup: Option<&ReplyMarkup>,
    ) -> Result<Message, TelegramError> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field.to_string(), part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        if let Some(markup) = markup {
            // Multipart bodies carry structured fields as JSON strings
            form = form.text("reply_markup", serde_json::to_string(markup)?);
        }

        debug!("Bot API upload: {} ({})", method, file_name);

        let response = self
            .http
            .post(self.config.method_url(method))
            .multipart(form)
            .send()
            .await?;

        Self::unwrap_response(method, response).await
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, TelegramError> {
        self.call_with_timeout(method, params, self.config.request_timeout)
            .await
    }

    /// Call a Bot API method with a JSON body.
    async fn call_with_timeout<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<P>,
        timeout: Duration,
    ) -> Result<R, TelegramError> {
        debug!("Bot API call: {}", method);

        let mut request = self
            .http
            .post(self.config.method_url(method))
            .timeout(timeout);
        if let Some(params) = params {
            request = request.json(&params);
        }

        let response = request.send().await?;
        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<R: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<R, TelegramError> {
        let status = response.status();
        let body = response.text().await?;
        let api: ApiResponse<R> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                TelegramError::Json(e)
            } else {
                TelegramError::Api {
                    code: i32::from(status.as_u16()),
                    description: body.clone(),
                }
            }
        })?;

        if !api.ok {
            return Err(TelegramError::Api {
                code: api.error_code.unwrap_or_else(|| i32::from(status.as_u16())),
                description: api.description.unwrap_or_default(),
            });
        }

        api.result
            .ok_or_else(|| TelegramError::MissingResult(method.to_string()))
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("config", &self.config)
            .finish()
    }
}
