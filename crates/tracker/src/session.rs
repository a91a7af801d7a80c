//! Per-user interactive sessions.
//!
//! A user is either idle or running exactly one interactive command. The
//! running command owns a [`SessionHandle`]; while it waits for free text it
//! installs a one-shot slot that [`SessionRegistry::deliver`] fills. Text that
//! arrives before the command starts waiting is held until it asks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use database::UserId;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Result, TrackerError};
use crate::shutdown::Shutdown;

/// Observable state of a user's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    InCommand(&'static str),
}

/// Outcome of handing free text to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A running command received the text, or will on its next wait.
    Delivered,
    /// No command is running, or one already holds an unread reply.
    Dropped,
}

#[derive(Debug)]
struct SessionEntry {
    generation: u64,
    command: &'static str,
    slot: Option<oneshot::Sender<String>>,
    /// Reply received while no wait was in progress.
    pending: Option<String>,
}

enum Wait {
    Ready(String),
    Pending(oneshot::Receiver<String>),
}

/// Registry of in-flight interactive commands, one per user.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<UserId, SessionEntry>,
    generations: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start an interactive command for `user_id`.
    ///
    /// Fails with [`TrackerError::Busy`] while another command is running;
    /// the running command is left untouched.
    pub fn begin(self: &Arc<Self>, user_id: UserId, command: &'static str) -> Result<SessionHandle> {
        match self.sessions.entry(user_id) {
            Entry::Occupied(existing) => {
                debug!(
                    user_id,
                    running = existing.get().command,
                    rejected = command,
                    "Session busy"
                );
                Err(TrackerError::Busy(user_id))
            }
            Entry::Vacant(vacant) => {
                let generation = self.generations.fetch_add(1, Ordering::SeqCst);
                vacant.insert(SessionEntry {
                    generation,
                    command,
                    slot: None,
                    pending: None,
                });
                debug!(user_id, command, "Session started");
                Ok(SessionHandle {
                    registry: Arc::clone(self),
                    user_id,
                    generation,
                })
            }
        }
    }

    /// Hand free text to the user's running command, if any.
    ///
    /// Never blocks: the slot is a one-shot channel. When the command has not
    /// started waiting yet, one reply is held for its next wait.
    pub fn deliver(&self, user_id: UserId, text: String) -> Delivery {
        let Some(mut entry) = self.sessions.get_mut(&user_id) else {
            return Delivery::Dropped;
        };

        if let Some(tx) = entry.slot.take() {
            return match tx.send(text) {
                Ok(()) => Delivery::Delivered,
                // The wait gave up (timeout); the command is finishing.
                Err(_) => Delivery::Dropped,
            };
        }

        if entry.pending.is_some() {
            debug!(user_id, "Reply already pending, dropped text");
            return Delivery::Dropped;
        }
        entry.pending = Some(text);
        Delivery::Delivered
    }

    /// End the user's session, waking a pending wait with `Cancelled`.
    ///
    /// Returns whether a session was running.
    pub fn end(&self, user_id: UserId) -> bool {
        self.sessions.remove(&user_id).is_some()
    }

    pub fn state(&self, user_id: UserId) -> SessionState {
        self.sessions
            .get(&user_id)
            .map(|entry| SessionState::InCommand(entry.command))
            .unwrap_or(SessionState::Idle)
    }

    fn end_generation(&self, user_id: UserId, generation: u64) {
        self.sessions
            .remove_if(&user_id, |_, entry| entry.generation == generation);
    }

    fn start_wait(&self, user_id: UserId, generation: u64) -> Option<Wait> {
        let mut entry = self.sessions.get_mut(&user_id)?;
        if entry.generation != generation {
            return None;
        }
        if let Some(text) = entry.pending.take() {
            return Some(Wait::Ready(text));
        }
        let (tx, rx) = oneshot::channel();
        entry.slot = Some(tx);
        Some(Wait::Pending(rx))
    }
}

/// Ownership of a user's session. Dropping it returns the user to idle.
#[derive(Debug)]
pub struct SessionHandle {
    registry: Arc<SessionRegistry>,
    user_id: UserId,
    generation: u64,
}

impl SessionHandle {
    /// Wait for the user's next free-text message.
    ///
    /// Returns a reply that arrived early right away. Otherwise bounded by
    /// `timeout`; resolves early with `Cancelled` when the session is ended
    /// from outside or shutdown is requested.
    pub async fn next_text(&self, timeout: Duration, shutdown: &Shutdown) -> Result<String> {
        let rx = match self.registry.start_wait(self.user_id, self.generation) {
            Some(Wait::Ready(text)) => return Ok(text),
            Some(Wait::Pending(rx)) => rx,
            None => return Err(TrackerError::Cancelled),
        };

        let mut shutdown = shutdown.clone();
        tokio::select! {
            result = tokio::time::timeout(timeout, rx) => match result {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(_)) => Err(TrackerError::Cancelled),
                Err(_) => Err(TrackerError::InputTimeout(timeout)),
            },
            () = shutdown.wait() => Err(TrackerError::Cancelled),
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.registry.end_generation(self.user_id, self.generation);
    }
}
