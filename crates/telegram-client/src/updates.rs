//! Long-polling update stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::{self, Stream};
use tracing::{debug, error, info, warn};

use crate::client::TelegramClient;
use crate::error::TelegramError;
use crate::types::Update;

/// Configuration for retrying failed polls.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of consecutive failures (None = infinite).
    pub max_retries: Option<u32>,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier for each retry.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }

    /// Check if we should retry after the given number of attempts.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_retries.map_or(true, |max| attempts < max)
    }
}

/// A stream of incoming updates.
///
/// Failed polls are yielded as errors and retried with backoff; the stream
/// ends once `max_retries` consecutive polls have failed.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<Update, TelegramError>> + Send>>;

struct PollState {
    client: TelegramClient,
    reconnect: ReconnectConfig,
    offset: Option<i64>,
    buffer: VecDeque<Update>,
    failures: u32,
    backoff: Option<Duration>,
    exhausted: bool,
}

/// Subscribe to updates with the default retry policy.
pub fn subscribe(client: &TelegramClient) -> UpdateStream {
    subscribe_with_reconnect(client, ReconnectConfig::default())
}

/// Subscribe to updates with a custom retry policy.
pub fn subscribe_with_reconnect(
    client: &TelegramClient,
    reconnect: ReconnectConfig,
) -> UpdateStream {
    info!("Starting long poll against {}", client.config().api_url);

    let state = PollState {
        client: client.clone(),
        reconnect,
        offset: None,
        buffer: VecDeque::new(),
        failures: 0,
        backoff: None,
        exhausted: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(update) = state.buffer.pop_front() {
                return Some((Ok(update), state));
            }
            if state.exhausted {
                return None;
            }
            if let Some(delay) = state.backoff.take() {
                tokio::time::sleep(delay).await;
            }

            match state.client.get_updates(state.offset).await {
                Ok(updates) => {
                    if state.failures > 0 {
                        info!("Long poll recovered after {} failures", state.failures);
                    }
                    state.failures = 0;
                    if let Some(last) = updates.iter().map(|u| u.update_id).max() {
                        state.offset = Some(last + 1);
                    }
                    debug!("Received {} updates", updates.len());
                    state.buffer.extend(updates);
                }
                Err(e) => {
                    let delay = state.reconnect.delay_for_attempt(state.failures);
                    state.failures += 1;
                    if state.reconnect.should_retry(state.failures) {
                        warn!(
                            "Long poll failed: {} (failures: {}, retry in {:?})",
                            e, state.failures, delay
                        );
                        state.backoff = Some(delay);
                    } else {
                        error!("Long poll failed {} times, giving up: {}", state.failures, e);
                        state.exhausted = true;
                    }
                    return Some((Err(e), state));
                }
            }
        }
    }))
}
