//! Notification delivery for the reference host.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{ExportError, Result};
use crate::host::{Notification, Notifier};

/// Logs every notification and, with an outbox, stores it there.
///
/// Each message becomes `<uuid>.json` in the outbox; its attachment is
/// copied next to it as `<uuid>-<filename>`.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    outbox: Option<PathBuf>,
}

impl LogNotifier {
    pub fn with_outbox(outbox: impl Into<PathBuf>) -> Self {
        Self {
            outbox: Some(outbox.into()),
        }
    }

    pub fn outbox(&self) -> Option<&Path> {
        self.outbox.as_deref()
    }

    fn store(&self, outbox: &Path, notification: &Notification) -> Result<PathBuf> {
        fs::create_dir_all(outbox).map_err(|e| ExportError::io(outbox, e))?;
        let id = Uuid::new_v4();

        let attachment = match &notification.attachment {
            Some(attachment) => {
                let copy = outbox.join(format!("{id}-{}", attachment.filename));
                fs::copy(&attachment.path, &copy).map_err(|e| ExportError::io(&attachment.path, e))?;
                Some(copy)
            }
            None => None,
        };

        let message = json!({
            "recipient": notification.recipient,
            "subject": notification.subject,
            "body": notification.body,
            "attachment": attachment.as_ref().map(|p| p.display().to_string()),
        });
        let path = outbox.join(format!("{id}.json"));
        let text = serde_json::to_string_pretty(&message)
            .map_err(|e| ExportError::Config(format!("cannot encode notification: {e}")))?;
        fs::write(&path, text).map_err(|e| ExportError::io(&path, e))?;
        Ok(path)
    }
}

impl Notifier for LogNotifier {
    fn send_notification(&self, notification: &Notification) -> Result<()> {
        info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            attachment = notification.attachment.as_ref().map(|a| a.filename.as_str()),
            "notification"
        );
        if let Some(outbox) = &self.outbox {
            let path = self.store(outbox, notification)?;
            info!(path = %path.display(), "stored notification in outbox");
        }
        Ok(())
    }
}
