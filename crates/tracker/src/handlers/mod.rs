//! Command and button handlers, one module per flow.
//!
//! Each module adds methods to [`crate::Tracker`]. Command handlers return
//! `Result<()>` and report failures in the chat; button handlers return an
//! acknowledgement for the callback query.

mod analytics;
mod manage;
mod prompt;
mod register;
mod schedule;
mod transfer;

#[cfg(test)]
pub(crate) mod testing;
