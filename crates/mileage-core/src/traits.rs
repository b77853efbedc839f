//! Trait definitions for external dependencies.
//!
//! The sync pipeline only talks to its collaborators through these traits
//! (report service, XML extraction, persistent store, notification), which
//! keeps [`SyncService`](crate::service::SyncService) free of I/O crates and
//! lets tests drive it with in-memory mocks.
//!
//! # Example
//!
//! ```
//! use mileage_core::traits::{MileageSource, RecordExtractor};
//! use mileage_core::{AppError, MileageRecord, ReportWindow};
//!
//! // Business logic uses traits, not concrete types
//! async fn records_for<S, X>(
//!     source: &S,
//!     extractor: &X,
//!     window: &ReportWindow,
//! ) -> Result<Vec<MileageRecord>, AppError>
//! where
//!     S: MileageSource,
//!     X: RecordExtractor,
//! {
//!     let doc = source.fetch(window).await?;
//!     extractor.extract(&doc)
//! }
//! ```

use std::future::Future;

use chrono::NaiveDate;

use crate::{AppError, InsertOutcome, MileageRecord, RawDocument, ReportWindow};

/// Remote service that reports mileage for a time window.
pub trait MileageSource: Send + Sync {
    /// Fetches the raw report document for `window`.
    ///
    /// One request per call, no retries. Unreachable service, non-success
    /// status and timeouts surface as transport errors.
    fn fetch(
        &self,
        window: &ReportWindow,
    ) -> impl Future<Output = Result<RawDocument, AppError>> + Send;
}

/// Turns a raw report document into mileage records.
pub trait RecordExtractor: Send + Sync {
    /// Extracts every entry in document order.
    ///
    /// Entries without a device id are dropped. Only a document that cannot
    /// be parsed at all is an error.
    fn extract(&self, document: &RawDocument) -> Result<Vec<MileageRecord>, AppError>;
}

/// Factory for transactional store sessions.
///
/// Separate from [`StoreSession`] so a run can own its session exclusively.
pub trait MileageStore: Send + Sync {
    /// The session type this store opens.
    type Session: StoreSession;

    /// Acquires a connection and begins a transaction.
    ///
    /// Fails with `AppError::ConnectionError` when the store is unreachable.
    fn open(&self) -> impl Future<Output = Result<Self::Session, AppError>> + Send;
}

/// One connection with an open transaction, owned by a single run.
///
/// After `commit` or `rollback` every further call except `close` fails with
/// `AppError::StoreState`.
pub trait StoreSession: Send {
    /// Returns true if a row for `device_id` exists on `date`.
    ///
    /// Sees rows inserted earlier in the same transaction.
    fn exists_for_date(
        &mut self,
        device_id: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Appends one row for `date`. Not committed until [`commit`](Self::commit).
    fn insert(
        &mut self,
        record: &MileageRecord,
        date: NaiveDate,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Inserts the row unless one already exists for the same device and date.
    ///
    /// Implementations must make the check and the insert atomic with respect
    /// to concurrent sessions.
    fn insert_if_absent(
        &mut self,
        record: &MileageRecord,
        date: NaiveDate,
    ) -> impl Future<Output = Result<InsertOutcome, AppError>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<(), AppError>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Releases the connection. Never fails.
    ///
    /// An open transaction that was neither committed nor rolled back is
    /// rolled back here.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Delivers the run summary.
pub trait Notifier: Send + Sync {
    /// Sends one message. A disabled notifier returns `Ok(())` without sending.
    fn notify(
        &self,
        subject: &str,
        html_body: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}
