//! Sync service for the daily mileage run.
//!
//! # Architecture
//!
//! The [`SyncService`] is generic over four traits:
//! - [`MileageSource`] - fetches the raw report for a day
//! - [`RecordExtractor`] - turns the report into records
//! - [`MileageStore`] - opens the transactional session records are written to
//! - [`Notifier`] - delivers the run summary
//!
//! # Pipeline
//!
//! ```text
//! Init -> Fetching -> Parsing -> Processing -> Committing -> Notifying -> Closed
//!              \          \            \             \
//!               +----------+------------+-------------+-> Error -> RollingBack -> Notifying -> Closed
//! ```
//!
//! A run never returns an error. Every failure ends up in the returned
//! [`SyncRun`] (`error_count == 1` plus the failing phase), the open
//! transaction is rolled back and a failure summary is still sent. The store
//! session is closed exactly once on every path that opened one.

use chrono::{Local, NaiveDate};

use crate::config::SyncConfig;
use crate::error::AppError;
use crate::models::ReportWindow;
use crate::notification::{render_html, render_subject};
use crate::progress::{SilentReporter, SyncEvent, SyncReporter};
use crate::sync::{InsertOutcome, RecordAction, SyncPhase, SyncRun, decide_record};
use crate::traits::{MileageSource, MileageStore, Notifier, RecordExtractor, StoreSession};

/// Returns the calendar day before `today`.
pub fn yesterday_of(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(NaiveDate::MIN)
}

/// Tracks the current phase and reports every transition.
struct PhaseTracker<'r, R: SyncReporter> {
    current: SyncPhase,
    reporter: &'r R,
}

impl<'r, R: SyncReporter> PhaseTracker<'r, R> {
    fn new(reporter: &'r R) -> Self {
        Self {
            current: SyncPhase::Init,
            reporter,
        }
    }

    fn enter(&mut self, to: SyncPhase) {
        if self.current != to {
            self.reporter.report(SyncEvent::PhaseChanged {
                from: self.current,
                to,
            });
            self.current = to;
        }
    }

    fn current(&self) -> SyncPhase {
        self.current
    }
}

/// Service running the fetch, parse, dedupe, insert and commit pipeline for
/// one calendar day.
///
/// # Type Parameters
///
/// * `S` - Report source (e.g., `SoapClient`)
/// * `X` - Record extractor (e.g., `XmlRecordExtractor`)
/// * `D` - Store (e.g., `MileageRepository`)
/// * `N` - Notifier (e.g., `SmtpNotifier`)
///
/// # Example
///
/// ```ignore
/// use mileage_core::SyncService;
///
/// let service = SyncService::new(soap, extractor, repo, mailer);
/// let run = service.run_yesterday().await;
/// println!("{} inserted, {} skipped", run.inserted_count(), run.skipped_count());
/// ```
pub struct SyncService<S, X, D, N>
where
    S: MileageSource,
    X: RecordExtractor,
    D: MileageStore,
    N: Notifier,
{
    source: S,
    extractor: X,
    store: D,
    notifier: N,
    config: SyncConfig,
}

impl<S, X, D, N> SyncService<S, X, D, N>
where
    S: MileageSource,
    X: RecordExtractor,
    D: MileageStore,
    N: Notifier,
{
    /// Creates a new sync service with default configuration.
    pub fn new(source: S, extractor: X, store: D, notifier: N) -> Self {
        Self::with_config(source, extractor, store, notifier, SyncConfig::default())
    }

    /// Creates a sync service with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Dedupe switch and notification subject prefix
    pub fn with_config(source: S, extractor: X, store: D, notifier: N, config: SyncConfig) -> Self {
        Self {
            source,
            extractor,
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronizes the day before today (local time).
    pub async fn run_yesterday(&self) -> SyncRun {
        self.run_for_date(yesterday_of(Local::now().date_naive()))
            .await
    }

    /// Synchronizes `date` without progress reporting.
    pub async fn run_for_date(&self, date: NaiveDate) -> SyncRun {
        self.run_for_date_with_progress(date, &SilentReporter).await
    }

    /// Synchronizes `date`, emitting events through `reporter`.
    pub async fn run_for_date_with_progress<R: SyncReporter>(
        &self,
        date: NaiveDate,
        reporter: &R,
    ) -> SyncRun {
        let mut run = SyncRun::new(date);
        let mut phases = PhaseTracker::new(reporter);

        reporter.report(SyncEvent::RunStarted {
            date,
            deduplicate: self.config.deduplicate,
        });

        match self.store.open().await {
            Ok(mut session) => {
                let window = ReportWindow::for_day(date);
                let result = self
                    .execute(&mut session, &window, &mut run, &mut phases)
                    .await;

                if let Err(e) = result {
                    self.record_failure(&mut run, &mut phases, &e);
                    phases.enter(SyncPhase::RollingBack);
                    if let Err(rb) = session.rollback().await {
                        let error = rb.to_string();
                        reporter.report(SyncEvent::RollbackFailed { error: &error });
                    }
                }

                self.send_summary(&run, &mut phases).await;
                session.close().await;
            }
            Err(e) => {
                // Nothing was opened: no rollback, no close.
                self.record_failure(&mut run, &mut phases, &e);
                self.send_summary(&run, &mut phases).await;
            }
        }

        phases.enter(SyncPhase::Closed);
        reporter.report(SyncEvent::RunFinished { run: &run });
        run
    }

    /// Fetch, parse, per-record processing and commit.
    ///
    /// Returns at the first error; the caller rolls back.
    async fn execute<R: SyncReporter>(
        &self,
        session: &mut D::Session,
        window: &ReportWindow,
        run: &mut SyncRun,
        phases: &mut PhaseTracker<'_, R>,
    ) -> Result<(), AppError> {
        let reporter = phases.reporter;
        let date = window.date();
        let deduplicate = self.config.deduplicate;

        phases.enter(SyncPhase::Fetching);
        let document = self.source.fetch(window).await?;
        reporter.report(SyncEvent::DocumentFetched {
            bytes: document.len(),
        });

        phases.enter(SyncPhase::Parsing);
        let records = self.extractor.extract(&document)?;
        reporter.report(SyncEvent::RecordsExtracted {
            count: records.len(),
        });

        phases.enter(SyncPhase::Processing);
        for (index, record) in records.into_iter().enumerate() {
            let already_stored = if deduplicate && record.is_valid() {
                session.exists_for_date(&record.device_id, date).await?
            } else {
                false
            };

            match decide_record(&record, deduplicate, already_stored) {
                RecordAction::Ignore => {
                    reporter.report(SyncEvent::RecordIgnored { index });
                }
                RecordAction::Skip => {
                    run.record_skipped();
                    reporter.report(SyncEvent::RecordSkipped {
                        device_id: &record.device_id,
                    });
                }
                RecordAction::InsertIfAbsent => {
                    match session.insert_if_absent(&record, date).await? {
                        InsertOutcome::Inserted => {
                            reporter.report(SyncEvent::RecordInserted {
                                device_id: &record.device_id,
                            });
                            run.record_inserted(record);
                        }
                        InsertOutcome::AlreadyPresent => {
                            // Another session stored it after our check.
                            run.record_skipped();
                            reporter.report(SyncEvent::RecordSkipped {
                                device_id: &record.device_id,
                            });
                        }
                    }
                }
                RecordAction::Insert => {
                    session.insert(&record, date).await?;
                    reporter.report(SyncEvent::RecordInserted {
                        device_id: &record.device_id,
                    });
                    run.record_inserted(record);
                }
            }
        }

        phases.enter(SyncPhase::Committing);
        session.commit().await?;
        run.mark_committed();
        reporter.report(SyncEvent::Committed {
            inserted: run.inserted_count(),
        });

        Ok(())
    }

    fn record_failure<R: SyncReporter>(
        &self,
        run: &mut SyncRun,
        phases: &mut PhaseTracker<'_, R>,
        error: &AppError,
    ) {
        let phase = phases.current();
        run.fail(phase, error);
        let message = error.to_string();
        phases.reporter.report(SyncEvent::Failed {
            phase,
            error: &message,
        });
        phases.enter(SyncPhase::Error);
    }

    /// Sends the summary for a failed run, or for a successful run that
    /// inserted at least one record. Notifier errors never affect the run.
    async fn send_summary<R: SyncReporter>(&self, run: &SyncRun, phases: &mut PhaseTracker<'_, R>) {
        phases.enter(SyncPhase::Notifying);
        if run.is_success() && run.inserted_count() == 0 {
            return;
        }

        let prefix = &self.config.subject_prefix;
        let subject = render_subject(prefix, run);
        let body = render_html(prefix, run);
        if let Err(e) = self.notifier.notify(&subject, &body).await {
            let error = e.to_string();
            phases
                .reporter
                .report(SyncEvent::NotificationFailed { error: &error });
        }
    }
}
