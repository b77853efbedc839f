//! ATS Mileage - command-line entry point for the daily mileage sync.
//!
//! The binary wires the SOAP client, XML extractor, PostgreSQL repository
//! and SMTP notifier into a [`SyncService`](mileage_core::SyncService) and
//! runs it for one day. This library holds the pieces that are worth testing
//! on their own: argument parsing, logging setup and the run summary.

pub mod config;

pub use config::{Config, version_info};

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mileage_core::SyncRun;
use tracing::Level;
use tracing::Subscriber;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const RULE: &str = "=======================================================";
const THIN_RULE: &str = "-------------------------------------------------------";

/// Builds the log subscriber: INFO by default, DEBUG with `--verbose`.
///
/// Logs always go to stderr. With a log file they are appended there too,
/// without ANSI colors.
pub fn build_subscriber(
    verbose: bool,
    log_file: Option<&Path>,
) -> anyhow::Result<impl Subscriber + Send + Sync + 'static> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (
                BoxMakeWriter::new(std::io::stderr.and(Arc::new(file))),
                false,
            )
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    Ok(FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(ansi)
        .with_writer(writer)
        .finish())
}

pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let subscriber = build_subscriber(verbose, log_file)?;
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install the log subscriber")
}

/// Human-readable run summary, one line per entry.
pub fn summary_lines(run: &SyncRun) -> Vec<String> {
    let mut lines = vec![
        RULE.to_string(),
        format!("Mileage sync: {}", run.target_date()),
        RULE.to_string(),
        format!("  + Inserted:          {}", run.inserted_count()),
        format!("  = Skipped:           {}", run.skipped_count()),
        format!("  x Errors:            {}", run.error_count()),
        THIN_RULE.to_string(),
        format!(
            "  Committed:           {}",
            if run.is_committed() { "yes" } else { "no" }
        ),
    ];

    if let Some(failure) = run.failure() {
        lines.push(format!("  Failed in:           {}", failure.phase));
        lines.push(format!("  Error:               {}", failure.message));
    }
    lines.push(RULE.to_string());
    lines
}

pub fn summary_json(run: &SyncRun) -> anyhow::Result<String> {
    serde_json::to_string_pretty(run).context("Failed to serialize run summary")
}

/// Process exit status: 0 only when the run recorded no errors.
pub fn exit_status(run: &SyncRun) -> u8 {
    if run.is_success() { 0 } else { 1 }
}
