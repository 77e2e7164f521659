//! The scheduled sweep: export every changed lesson and mail it out.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::export::template::{failure_body, publish_body};
use crate::export::{Artifact, ExportRequest, LessonExporter};
use crate::host::{Attachment, Host, Notification};
use crate::store::{PageOrderRepository, QueueEntry, QueueRepository};

use super::ExportQueue;

/// Why a sweep did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// No publish address is configured.
    NoPublishAddress,
    /// First run; only the watermark was recorded.
    FirstRun,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    /// Lessons the refresh put (back) in the queue.
    pub queued: usize,
    pub exported: usize,
    pub failed: usize,
    /// Lessons that got their failure notification this run.
    pub exhausted: usize,
}

impl SweepReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

/// Runs one scheduled sweep at `now`.
///
/// Refreshes the queue from lessons changed since the last run, then drains
/// it: each lesson is exported as a PDF, mailed to the publish address and
/// dequeued. A lesson on its last attempt first triggers a failure notice.
/// One lesson failing never stops the others.
pub fn run_scheduled_sweep<H, S>(
    host: &H,
    store: &mut S,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<SweepReport>
where
    H: Host + ?Sized,
    S: PageOrderRepository + QueueRepository + ?Sized,
{
    let Some(recipient) = config.publish_address() else {
        info!("no publish address configured, skipping sweep");
        return Ok(SweepReport::skipped(SkipReason::NoPublishAddress));
    };

    let mut cursor = store.cursor()?;
    let Some(since) = cursor.changes_since() else {
        cursor.last_run = Some(now);
        store.save_cursor(&cursor)?;
        info!(%now, "first sweep, recording watermark only");
        return Ok(SweepReport::skipped(SkipReason::FirstRun));
    };

    let max_attempts = config.max_export_attempts;
    let mut report = SweepReport {
        queued: ExportQueue::new(&mut *store, max_attempts)
            .refresh(host, since, now)?
            .total(),
        ..SweepReport::default()
    };

    let exporter = LessonExporter::new(host, config);
    loop {
        let (entry, is_final) = {
            let mut queue = ExportQueue::new(&mut *store, max_attempts);
            let Some(entry) = queue.next_pending()? else {
                break;
            };
            let is_final = queue.is_final_attempt(&entry);
            (entry, is_final)
        };

        if is_final {
            report.exhausted += 1;
            if let Err(err) = notify_failure(host, recipient, &entry) {
                warn!(lesson = %entry.lesson, error = %err, "could not send failure notice");
            }
        }

        match publish(host, &exporter, &mut *store, recipient, &entry) {
            Ok(()) => {
                ExportQueue::new(&mut *store, max_attempts).remove(&entry)?;
                report.exported += 1;
            }
            Err(err) => {
                report.failed += 1;
                warn!(
                    lesson = %entry.lesson,
                    attempt = entry.attempts + 1,
                    error = %err,
                    "scheduled export failed"
                );
            }
        }
    }

    // The refresh already saved the queue watermark.
    let mut cursor = store.cursor()?;
    cursor.last_run = Some(now);
    store.save_cursor(&cursor)?;

    info!(
        queued = report.queued,
        exported = report.exported,
        failed = report.failed,
        exhausted = report.exhausted,
        "sweep finished"
    );
    Ok(report)
}

fn notify_failure<H: Host + ?Sized>(host: &H, recipient: &str, entry: &QueueEntry) -> Result<()> {
    let lesson = host.lesson(entry.lesson)?;
    host.send_notification(&Notification {
        recipient: recipient.to_string(),
        subject: format!("Lesson export failed: {}", lesson.name),
        body: failure_body(&lesson.name, entry.attempts)?,
        attachment: None,
    })
}

/// Exports one lesson to a file, sends it and deletes the file.
fn publish<H, S>(
    host: &H,
    exporter: &LessonExporter<'_, H>,
    store: &mut S,
    recipient: &str,
    entry: &QueueEntry,
) -> Result<()>
where
    H: Host + ?Sized,
    S: PageOrderRepository + ?Sized,
{
    let lesson = host.lesson(entry.lesson)?;
    let artifact = exporter.export(store, &ExportRequest::scheduled(entry.lesson))?;
    let Artifact::File { path, filename } = artifact else {
        return Err(ExportError::Config(
            "scheduled export did not produce a file".to_string(),
        ));
    };

    let sent = host.send_notification(&Notification {
        recipient: recipient.to_string(),
        subject: format!("Lesson updated: {}", lesson.name),
        body: publish_body(&lesson.name, &filename)?,
        attachment: Some(Attachment {
            path: path.clone(),
            filename,
        }),
    });
    if let Err(err) = std::fs::remove_file(&path) {
        warn!(path = %path.display(), error = %err, "could not delete export file");
    }
    sent
}
