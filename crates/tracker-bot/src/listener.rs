//! Long-poll loop feeding Telegram updates into the tracker.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use telegram_client::{CallbackQuery, Message, TelegramClient, Update};
use tracing::{debug, error, info, warn};
use tracker::{EventKind, InboundEvent, Shutdown, Tracker};

/// Convert an update into a tracker event.
///
/// Returns `None` for updates the tracker has no use for: messages from bots
/// or without a sender, callbacks detached from a message, and messages with
/// neither text nor a document.
pub fn to_event(update: Update) -> Option<InboundEvent> {
    if let Some(query) = update.callback_query {
        return callback_event(query);
    }
    message_event(update.message?)
}

fn message_event(message: Message) -> Option<InboundEvent> {
    let from = message.from.as_ref()?;
    if from.is_bot {
        return None;
    }

    let kind = if let Some((name, args)) = message.command() {
        EventKind::Command {
            name: name.to_string(),
            args: args.to_string(),
        }
    } else if let Some(document) = &message.document {
        EventKind::Document {
            file_id: document.file_id.clone(),
            file_name: document.file_name.clone(),
        }
    } else {
        EventKind::Text(message.text.clone()?)
    };

    Some(InboundEvent {
        user_id: from.id,
        chat_id: message.chat.id,
        message_id: message.message_id,
        kind,
    })
}

fn callback_event(query: CallbackQuery) -> Option<InboundEvent> {
    let message = query.message?;
    let data = query.data?;
    let sent_at = DateTime::<Utc>::from_timestamp(message.date, 0)?;

    Some(InboundEvent {
        user_id: query.from.id,
        chat_id: message.chat.id,
        message_id: message.message_id,
        kind: EventKind::Callback {
            id: query.id,
            data,
            sent_at,
        },
    })
}

/// Poll until shutdown or until the update stream gives up.
///
/// Every event runs on its own task so a flow waiting for input never
/// blocks the updates behind it.
pub async fn run(client: TelegramClient, tracker: Tracker, mut shutdown: Shutdown) {
    let mut updates = telegram_client::subscribe(&client);
    info!("Listening for updates");

    loop {
        tokio::select! {
            next = updates.next() => match next {
                Some(Ok(update)) => {
                    let update_id = update.update_id;
                    match to_event(update) {
                        Some(event) => {
                            let tracker = tracker.clone();
                            tokio::spawn(async move { tracker.handle(event).await });
                        }
                        None => debug!("Ignoring update {}", update_id),
                    }
                }
                Some(Err(e)) => warn!("Polling failed: {}", e),
                None => {
                    error!("Update stream ended");
                    break;
                }
            },
            () = shutdown.wait() => {
                info!("Listener stopped");
                break;
            }
        }
    }
}
