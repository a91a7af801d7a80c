//! Registering new activities.

use database::{User, UserId};
use tracing::{info, warn};

use crate::command::Command;
use crate::error::Result;
use crate::keyboard::Markup;
use crate::session::SessionHandle;
use crate::tracker::{Ack, Tracker};
use crate::tree::{self, PATH_SEPARATOR};

const ASK_PATH: &str = "Send the new activity. Separate levels with \" / \", e.g. Work / Coding / Rust";

impl Tracker {
    /// `/register_new_activity [path]`.
    ///
    /// With a path the activity is added right away; without one the command
    /// waits for the user's reply.
    pub(crate) async fn execute_register_command(&self, user: &User, args: &str) -> Result<()> {
        if !args.trim().is_empty() {
            let path = self.add_activity_path(user.id, args).await?;
            self.send_added(user, &path).await;
            return Ok(());
        }

        let session = self
            .sessions
            .begin(user.id, Command::RegisterNewActivity.name())?;
        self.run_register_flow(user, session).await;
        Ok(())
    }

    /// The "Add new activity" prompt button.
    pub(crate) async fn execute_register_callback(&self, user: &User, callback_id: &str) -> Result<Ack> {
        // Busy is answered on the button itself.
        let session = self
            .sessions
            .begin(user.id, Command::RegisterNewActivity.name())?;
        if let Err(e) = self.sender.answer_callback(callback_id, None).await {
            warn!("Failed to answer callback {}: {}", callback_id, e);
        }
        self.run_register_flow(user, session).await;
        Ok(Ack::Done)
    }

    /// Insert `path` under the user's tree lock. Returns the normalised path.
    pub(crate) async fn add_activity_path(&self, user_id: UserId, path: &str) -> Result<String> {
        let normalised = tree::parse_path(path)?.join(PATH_SEPARATOR);
        let _guard = self.locks.lock(user_id).await;
        let leaf_id = tree::parse_and_add_activity(&self.pool, user_id, &normalised).await?;
        info!(user_id, leaf_id, "Registered activity {}", normalised);
        Ok(normalised)
    }

    async fn run_register_flow(&self, user: &User, session: SessionHandle) {
        if let Err(e) = self.register_flow(user, &session).await {
            self.report(user.id, user.chat_id, &e).await;
        }
    }

    async fn register_flow(&self, user: &User, session: &SessionHandle) -> Result<()> {
        self.sender
            .send_text(user.chat_id, ASK_PATH, Markup::ForceReply)
            .await?;
        let reply = session
            .next_text(self.config.input_timeout, &self.shutdown)
            .await?;
        let path = self.add_activity_path(user.id, &reply).await?;
        self.send_added(user, &path).await;
        Ok(())
    }

    async fn send_added(&self, user: &User, path: &str) {
        let text = format!("New activity \"{}\" added!", path);
        if let Err(e) = self.sender.send_text(user.chat_id, &text, Markup::None).await {
            warn!("Failed to confirm activity for user {}: {}", user.id, e);
        }
    }
}
