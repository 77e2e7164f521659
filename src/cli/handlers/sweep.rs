//! Handler for the `sweep` command.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::cli::SweepArgs;
use crate::cli::output::emit;
use crate::config::Config;
use crate::host::LogNotifier;
use crate::queue::{SkipReason, SweepReport, run_scheduled_sweep};

use super::Session;

/// Handle the `sweep` command.
pub fn handle_sweep(args: &SweepArgs, config: &Config, database: &Path) -> Result<()> {
    let Session { host, mut store } = Session::open(config, database)?;
    let host = match &args.outbox {
        Some(dir) => host.with_notifier(LogNotifier::with_outbox(dir)),
        None => host,
    };

    let report = run_scheduled_sweep(&host, &mut store, config, Utc::now())
        .context("scheduled sweep failed")?;

    emit(args.format, report, print_report)
}

fn print_report(report: &SweepReport) {
    match report.skipped {
        Some(SkipReason::NoPublishAddress) => {
            println!("Sweep skipped: no publish_email configured");
        }
        Some(SkipReason::FirstRun) => {
            println!("First sweep: recorded the starting point, nothing exported");
        }
        None => {
            println!(
                "Queued {}, exported {}, failed {}",
                report.queued, report.exported, report.failed
            );
            if report.exhausted > 0 {
                println!("{} lesson(s) reached the attempt limit", report.exhausted);
            }
        }
    }
}
