//! Progress reporting for sync runs.
//!
//! [`SyncService`](crate::service::SyncService) emits a [`SyncEvent`] at every
//! phase change and per-record decision. Frontends choose how to surface
//! them: [`TracingReporter`] logs through `tracing`, [`SilentReporter`]
//! drops everything.

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::sync::{SyncPhase, SyncRun};

/// Events emitted during a sync run.
#[derive(Debug, Clone)]
pub enum SyncEvent<'a> {
    /// A run for `date` started.
    RunStarted { date: NaiveDate, deduplicate: bool },
    /// The pipeline moved to a new phase.
    PhaseChanged { from: SyncPhase, to: SyncPhase },
    /// The report document was received.
    DocumentFetched { bytes: usize },
    /// Records were extracted from the document.
    RecordsExtracted { count: usize },
    /// A record without device id was dropped.
    RecordIgnored { index: usize },
    /// A record was already stored for the date.
    RecordSkipped { device_id: &'a str },
    /// A record was written to the open transaction.
    RecordInserted { device_id: &'a str },
    /// The transaction was committed.
    Committed { inserted: usize },
    /// The run failed in `phase`.
    Failed { phase: SyncPhase, error: &'a str },
    /// Rollback after a failure did not succeed.
    RollbackFailed { error: &'a str },
    /// Sending the summary failed; the run result is unaffected.
    NotificationFailed { error: &'a str },
    /// The run finished and its session (if any) was closed.
    RunFinished { run: &'a SyncRun },
}

/// Trait for reporting sync events.
pub trait SyncReporter: Send + Sync {
    /// Called when a sync event occurs.
    ///
    /// The default implementation does nothing (silent mode).
    fn report(&self, event: SyncEvent<'_>) {
        let _ = event;
    }
}

/// Silent reporter that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl SyncReporter for SilentReporter {}

/// Tracing-based reporter for CLI logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl SyncReporter for TracingReporter {
    fn report(&self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::RunStarted { date, deduplicate } => {
                info!(%date, deduplicate, "Mileage sync started");
            }
            SyncEvent::PhaseChanged { from, to } => {
                debug!(%from, %to, "Phase transition");
            }
            SyncEvent::DocumentFetched { bytes } => {
                info!(bytes, "Report document received");
            }
            SyncEvent::RecordsExtracted { count } => {
                info!(count, "Records extracted");
            }
            SyncEvent::RecordIgnored { index } => {
                debug!(index, "Record without device id ignored");
            }
            SyncEvent::RecordSkipped { device_id } => {
                debug!(device_id, "Already stored for date, skipped");
            }
            SyncEvent::RecordInserted { device_id } => {
                debug!(device_id, "Inserted");
            }
            SyncEvent::Committed { inserted } => {
                info!(inserted, "Transaction committed");
            }
            SyncEvent::Failed { phase, error } => {
                error!(%phase, error, "Mileage sync failed, rolling back");
            }
            SyncEvent::RollbackFailed { error } => {
                error!(error, "Rollback failed");
            }
            SyncEvent::NotificationFailed { error } => {
                warn!(error, "Summary notification not sent");
            }
            SyncEvent::RunFinished { run } => {
                info!(
                    date = %run.target_date(),
                    inserted = run.inserted_count(),
                    skipped = run.skipped_count(),
                    errors = run.error_count(),
                    "Mileage sync finished"
                );
            }
        }
    }
}
