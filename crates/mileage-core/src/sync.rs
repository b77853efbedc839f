//! Run bookkeeping and per-record decisions for the mileage sync.
//!
//! This module holds the pure parts of a run: the phase machine, the
//! accumulated run summary and the dedupe decision. No I/O happens here.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::error::AppError;
use crate::models::MileageRecord;

/// Pipeline phase of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Init,
    Fetching,
    Parsing,
    Processing,
    Committing,
    Error,
    RollingBack,
    Notifying,
    Closed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Processing => "processing",
            Self::Committing => "committing",
            Self::Error => "error",
            Self::RollingBack => "rolling_back",
            Self::Notifying => "notifying",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    /// Phase that was active when the error surfaced.
    pub phase: SyncPhase,
    pub message: String,
}

/// Result of a guarded insert on a store session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// A row for the same device and date was already stored.
    AlreadyPresent,
}

/// What the pipeline does with one extracted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    /// Record has no device id; dropped without being counted.
    Ignore,
    /// Already stored for the report date; counted as skipped.
    Skip,
    /// Insert only if no row exists, under the store's per-key lock.
    InsertIfAbsent,
    /// Insert unconditionally.
    Insert,
}

/// Decides how to handle a record.
///
/// # Arguments
/// * `record` - The extracted record
/// * `deduplicate` - Whether dedupe is enabled for this run
/// * `already_stored` - Result of the duplicate check (ignored when dedupe is off)
pub fn decide_record(
    record: &MileageRecord,
    deduplicate: bool,
    already_stored: bool,
) -> RecordAction {
    if !record.is_valid() {
        return RecordAction::Ignore;
    }
    match (deduplicate, already_stored) {
        (true, true) => RecordAction::Skip,
        (true, false) => RecordAction::InsertIfAbsent,
        (false, _) => RecordAction::Insert,
    }
}

/// Summary of one sync run for one target date.
///
/// Counters start at zero and are only advanced by the sync service. The
/// inserted count is always the length of the inserted record list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRun {
    target_date: NaiveDate,
    inserted_records: Vec<MileageRecord>,
    skipped_count: usize,
    error_count: usize,
    committed: bool,
    failure: Option<SyncFailure>,
}

impl SyncRun {
    pub fn new(target_date: NaiveDate) -> Self {
        Self {
            target_date,
            inserted_records: Vec::new(),
            skipped_count: 0,
            error_count: 0,
            committed: false,
            failure: None,
        }
    }

    pub fn target_date(&self) -> NaiveDate {
        self.target_date
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted_records.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Records accepted by this run, in extraction order.
    ///
    /// On a failed run these rows were rolled back and are not stored.
    pub fn inserted_records(&self) -> &[MileageRecord] {
        &self.inserted_records
    }

    /// Returns true if the run's transaction was committed.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn failure(&self) -> Option<&SyncFailure> {
        self.failure.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error_count == 0
    }

    pub(crate) fn record_inserted(&mut self, record: MileageRecord) {
        self.inserted_records.push(record);
    }

    pub(crate) fn record_skipped(&mut self) {
        self.skipped_count += 1;
    }

    pub(crate) fn mark_committed(&mut self) {
        self.committed = true;
    }

    pub(crate) fn fail(&mut self, phase: SyncPhase, error: &AppError) {
        self.error_count += 1;
        self.failure = Some(SyncFailure {
            phase,
            message: error.to_string(),
        });
    }
}

impl Serialize for SyncRun {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SyncRun", 7)?;
        state.serialize_field("target_date", &self.target_date)?;
        state.serialize_field("inserted_count", &self.inserted_count())?;
        state.serialize_field("skipped_count", &self.skipped_count)?;
        state.serialize_field("error_count", &self.error_count)?;
        state.serialize_field("committed", &self.committed)?;
        state.serialize_field("failure", &self.failure)?;
        state.serialize_field("inserted_records", &self.inserted_records)?;
        state.end()
    }
}
