//! Export and import commands.

use chrono::Utc;
use database::User;

use crate::error::{Result, TrackerError};
use crate::keyboard::Markup;
use crate::tracker::Tracker;
use crate::transfer;

const IMPORT_HELP: &str = "Send me a .yaml file made with /export_activities. Activities in it are merged into yours: existing ones keep their place and take the file's mute setting, missing ones are created.";

impl Tracker {
    pub(crate) async fn execute_export(&self, user: &User) -> Result<()> {
        let (file_name, bytes) = transfer::export_activities(&self.pool, user.id, Utc::now()).await?;
        self.sender
            .send_document(user.chat_id, &file_name, bytes, Some("Your activities"))
            .await?;
        Ok(())
    }

    pub(crate) async fn execute_import_instructions(&self, user: &User) -> Result<()> {
        self.sender
            .send_text(user.chat_id, IMPORT_HELP, Markup::None)
            .await?;
        Ok(())
    }

    /// Every uploaded document is treated as an import.
    pub(crate) async fn execute_import_document(
        &self,
        user: &User,
        file_id: &str,
        file_name: Option<&str>,
    ) -> Result<()> {
        if !transfer::is_supported_file(file_name) {
            return Err(TrackerError::validation(
                "Only .yaml or .yml files made with /export_activities can be imported.",
            ));
        }

        let bytes = self.sender.download_file(file_id).await?;
        let summary = {
            let _guard = self.locks.lock(user.id).await;
            transfer::import_activities(&self.pool, user.id, &bytes).await?
        };

        let text = format!(
            "✅ Import finished: {} created, {} updated, {} unchanged.",
            summary.created, summary.updated, summary.unchanged
        );
        self.sender.send_text(user.chat_id, &text, Markup::None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{command, document, Harness};
    use crate::sender::testing::Sent;
    use crate::tree;

    #[tokio::test]
    async fn test_export_then_import_document() {
        let h = Harness::new().await;
        tree::parse_and_add_activity(h.pool(), 1, "Work / Coding").await.unwrap();

        h.tracker.handle(command(1, "/export_activities")).await;
        let (file_name, bytes) = match h.sender.last() {
            Some(Sent::Document { file_name, bytes, .. }) => (file_name, bytes),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(file_name, "activities_export_1.yaml");

        h.sender.add_file("file-1", &bytes);
        h.tracker.handle(document(2, "file-1", &file_name)).await;

        assert_eq!(
            h.sender.texts().last().unwrap(),
            "✅ Import finished: 2 created, 0 updated, 0 unchanged."
        );
        let routes = tree::full_activities(h.pool(), 2).await.unwrap();
        assert_eq!(routes[0].name, "Work / Coding");
    }

    #[tokio::test]
    async fn test_rejects_other_files() {
        let h = Harness::new().await;
        h.sender.add_file("file-1", b"hello");
        h.tracker.handle(document(1, "file-1", "notes.txt")).await;

        assert!(h.sender.texts().last().unwrap().starts_with("Only .yaml"));
    }

    #[tokio::test]
    async fn test_reports_bad_version() {
        let h = Harness::new().await;
        let yaml = "version: \"2.0\"\nuser_id: 1\nexport_date: 2025-03-01T00:00:00Z\nactivities: []\n";
        h.sender.add_file("file-1", yaml.as_bytes());
        h.tracker.handle(document(1, "file-1", "backup.yaml")).await;

        assert!(h
            .sender
            .texts()
            .last()
            .unwrap()
            .contains("Unsupported export version"));
    }

    #[tokio::test]
    async fn test_import_command_explains() {
        let h = Harness::new().await;
        h.tracker.handle(command(1, "/import_activities")).await;
        assert!(h.sender.texts()[0].contains(".yaml"));
    }
}
