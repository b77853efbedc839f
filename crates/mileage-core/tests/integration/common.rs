//! Test utilities and mock implementations for integration tests.
//!
//! Every mock keeps its state behind `Arc<Mutex<..>>` so a test can hand a
//! clone to the service and inspect the calls afterwards.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use mileage_core::traits::{MileageSource, MileageStore, Notifier, RecordExtractor, StoreSession};
use mileage_core::{
    AppError, InsertOutcome, MileageRecord, RawDocument, ReportWindow, SyncEvent, SyncPhase,
    SyncReporter,
};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn record(device: &str, plate: &str, km: i64) -> MileageRecord {
    MileageRecord::new(device).with_plate(plate).with_mileage(km)
}

// =============================================================================
// MockSource
// =============================================================================

#[derive(Clone)]
enum SourceBehavior {
    Document(String),
    Unreachable,
    TimedOut,
}

/// Report source returning a fixed body or a fixed failure.
#[derive(Clone)]
pub struct MockSource {
    behavior: SourceBehavior,
    windows: Arc<Mutex<Vec<ReportWindow>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::with_document("<report/>")
    }

    pub fn with_document(body: &str) -> Self {
        Self {
            behavior: SourceBehavior::Document(body.to_string()),
            windows: Arc::default(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            behavior: SourceBehavior::Unreachable,
            windows: Arc::default(),
        }
    }

    pub fn timing_out() -> Self {
        Self {
            behavior: SourceBehavior::TimedOut,
            windows: Arc::default(),
        }
    }

    /// Windows requested so far, in call order.
    pub fn windows(&self) -> Vec<ReportWindow> {
        self.windows.lock().unwrap().clone()
    }
}

impl MileageSource for MockSource {
    async fn fetch(&self, window: &ReportWindow) -> Result<RawDocument, AppError> {
        self.windows.lock().unwrap().push(*window);
        match &self.behavior {
            SourceBehavior::Document(body) => Ok(RawDocument::new(body.clone())),
            SourceBehavior::Unreachable => Err(AppError::TransportError(
                "HTTP 503 Service Unavailable from http://mock".to_string(),
            )),
            SourceBehavior::TimedOut => Err(AppError::Timeout(60)),
        }
    }
}

// =============================================================================
// MockExtractor
// =============================================================================

/// Extractor returning a prepared record list, or failing as malformed.
#[derive(Clone)]
pub struct MockExtractor {
    records: Option<Vec<MileageRecord>>,
}

impl MockExtractor {
    pub fn returning(records: Vec<MileageRecord>) -> Self {
        Self {
            records: Some(records),
        }
    }

    pub fn malformed() -> Self {
        Self { records: None }
    }
}

impl RecordExtractor for MockExtractor {
    fn extract(&self, _document: &RawDocument) -> Result<Vec<MileageRecord>, AppError> {
        self.records
            .clone()
            .ok_or_else(|| AppError::MalformedDocument("unexpected end of stream".to_string()))
    }
}

// =============================================================================
// MockStore / MockSession
// =============================================================================

/// A stored row as the mock sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub date: NaiveDate,
    pub record: MileageRecord,
}

#[derive(Default)]
struct StoreState {
    rows: Vec<StoredRow>,
    /// Rows that only become visible to the guarded insert, simulating a
    /// concurrent session committing between check and insert.
    racing: Vec<(String, NaiveDate)>,
    fail_open: bool,
    fail_exists_at: Option<usize>,
    fail_insert_at: Option<usize>,
    fail_commit: bool,
    fail_rollback: bool,
    opens: usize,
    exists_calls: usize,
    insert_calls: usize,
    commits: usize,
    rollbacks: usize,
    closes: usize,
}

/// In-memory store with per-session pending rows.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<StoreState>>,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a committed row.
    pub fn with_row(self, date: NaiveDate, record: MileageRecord) -> Self {
        self.state
            .lock()
            .unwrap()
            .rows
            .push(StoredRow { date, record });
        self
    }

    pub fn with_racing_row(self, device_id: &str, date: NaiveDate) -> Self {
        self.state
            .lock()
            .unwrap()
            .racing
            .push((device_id.to_string(), date));
        self
    }

    pub fn failing_open(self) -> Self {
        self.state.lock().unwrap().fail_open = true;
        self
    }

    /// Makes the `n`th duplicate check (1-based) fail.
    pub fn failing_exists_at(self, n: usize) -> Self {
        self.state.lock().unwrap().fail_exists_at = Some(n);
        self
    }

    /// Makes the `n`th insert call (1-based) fail.
    pub fn failing_insert_at(self, n: usize) -> Self {
        self.state.lock().unwrap().fail_insert_at = Some(n);
        self
    }

    pub fn failing_commit(self) -> Self {
        self.state.lock().unwrap().fail_commit = true;
        self
    }

    pub fn failing_rollback(self) -> Self {
        self.state.lock().unwrap().fail_rollback = true;
        self
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn rows_for(&self, device_id: &str, date: NaiveDate) -> usize {
        self.state
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|r| r.record.device_id == device_id && r.date == date)
            .count()
    }

    pub fn opens(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    pub fn exists_calls(&self) -> usize {
        self.state.lock().unwrap().exists_calls
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().insert_calls
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

impl MileageStore for MockStore {
    type Session = MockSession;

    async fn open(&self) -> Result<MockSession, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(AppError::ConnectionError("connection refused".to_string()));
        }
        state.opens += 1;
        Ok(MockSession {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
            ended: false,
        })
    }
}

pub struct MockSession {
    state: Arc<Mutex<StoreState>>,
    pending: Vec<StoredRow>,
    ended: bool,
}

impl MockSession {
    fn ensure_open(&self) -> Result<(), AppError> {
        if self.ended {
            Err(AppError::StoreState("transaction already ended".to_string()))
        } else {
            Ok(())
        }
    }

    fn visible(&self, device_id: &str, date: NaiveDate) -> bool {
        let state = self.state.lock().unwrap();
        state
            .rows
            .iter()
            .chain(self.pending.iter())
            .any(|r| r.record.device_id == device_id && r.date == date)
    }

    fn next_insert(&mut self) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;
        if state.fail_insert_at == Some(state.insert_calls) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl StoreSession for MockSession {
    async fn exists_for_date(&mut self, device_id: &str, date: NaiveDate) -> Result<bool, AppError> {
        self.ensure_open()?;
        {
            let mut state = self.state.lock().unwrap();
            state.exists_calls += 1;
            if state.fail_exists_at == Some(state.exists_calls) {
                return Err(AppError::DatabaseError(sqlx::Error::PoolClosed));
            }
        }
        Ok(self.visible(device_id, date))
    }

    async fn insert(&mut self, record: &MileageRecord, date: NaiveDate) -> Result<(), AppError> {
        self.ensure_open()?;
        self.next_insert()?;
        self.pending.push(StoredRow {
            date,
            record: record.clone(),
        });
        Ok(())
    }

    async fn insert_if_absent(
        &mut self,
        record: &MileageRecord,
        date: NaiveDate,
    ) -> Result<InsertOutcome, AppError> {
        self.ensure_open()?;
        self.next_insert()?;
        let racing = self
            .state
            .lock()
            .unwrap()
            .racing
            .iter()
            .any(|(d, dt)| d == &record.device_id && *dt == date);
        if racing || self.visible(&record.device_id, date) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        self.pending.push(StoredRow {
            date,
            record: record.clone(),
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        self.ensure_open()?;
        self.ended = true;
        let mut state = self.state.lock().unwrap();
        state.commits += 1;
        if state.fail_commit {
            self.pending.clear();
            return Err(AppError::DatabaseError(sqlx::Error::WorkerCrashed));
        }
        state.rows.append(&mut self.pending);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.rollbacks += 1;
        self.pending.clear();
        self.ended = true;
        if state.fail_rollback {
            return Err(AppError::DatabaseError(sqlx::Error::WorkerCrashed));
        }
        Ok(())
    }

    async fn close(self) {
        self.state.lock().unwrap().closes += 1;
    }
}

// =============================================================================
// MockNotifier
// =============================================================================

/// A message captured by [`MockNotifier`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub subject: String,
    pub body: String,
}

/// Notifier that records every message, optionally failing each send.
#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for MockNotifier {
    async fn notify(&self, subject: &str, html_body: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentMessage {
            subject: subject.to_string(),
            body: html_body.to_string(),
        });
        if self.fail {
            return Err(AppError::NotificationError(
                "535 authentication failed".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// PhaseRecorder
// =============================================================================

/// Reporter collecting every phase entered, in order.
#[derive(Default)]
pub struct PhaseRecorder {
    phases: Mutex<Vec<SyncPhase>>,
}

impl PhaseRecorder {
    pub fn phases(&self) -> Vec<SyncPhase> {
        self.phases.lock().unwrap().clone()
    }
}

impl SyncReporter for PhaseRecorder {
    fn report(&self, event: SyncEvent<'_>) {
        if let SyncEvent::PhaseChanged { to, .. } = event {
            self.phases.lock().unwrap().push(to);
        }
    }
}
