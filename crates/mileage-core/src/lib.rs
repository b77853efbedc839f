//! Mileage Core - Domain types, business logic, and the sync service.
//!
//! This crate provides the core functionality of the daily mileage sync:
//!
//! - **Domain models**: [`MileageRecord`], [`RawDocument`], [`ReportWindow`]
//! - **Business logic**: dedupe decision and run bookkeeping ([`SyncRun`])
//! - **Services**: [`SyncService`] running fetch, parse, dedupe, insert, commit
//! - **Traits**: [`MileageSource`], [`RecordExtractor`], [`MileageStore`],
//!   [`StoreSession`], [`Notifier`] for dependency injection
//! - **Progress reporting**: [`SyncReporter`] trait for decoupled logging
//!
//! # Architecture
//!
//! This crate has no network, XML or mail dependencies. Concrete
//! implementations live in `mileage-client` (SOAP, XML, SMTP) and
//! `mileage-db` (PostgreSQL); the `ats-mileage` binary wires them together.
//!
//! # Example
//!
//! ```ignore
//! use mileage_core::{SyncConfig, SyncService, TracingReporter};
//!
//! let service = SyncService::with_config(soap, extractor, repo, mailer, SyncConfig::default());
//! let run = service
//!     .run_for_date_with_progress(date, &TracingReporter)
//!     .await;
//! assert_eq!(run.inserted_count(), run.inserted_records().len());
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod notification;
pub mod progress;
pub mod service;
pub mod sync;
pub mod traits;

// Configuration
pub use config::{DbConfig, HttpConfig, SmtpConfig, SoapConfig, SyncConfig, parse_flag};

// Error handling
pub use error::AppError;

// Domain models
pub use models::{MileageRecord, RawDocument, ReportWindow};

// Sync types and business logic
pub use sync::{InsertOutcome, RecordAction, SyncFailure, SyncPhase, SyncRun, decide_record};

// Summary rendering
pub use notification::{escape_markup, render_html, render_subject};

// Progress reporting
pub use progress::{SilentReporter, SyncEvent, SyncReporter, TracingReporter};

// Traits for dependency injection
pub use traits::{MileageSource, MileageStore, Notifier, RecordExtractor, StoreSession};

// Services (generic over trait implementations)
pub use service::{SyncService, yesterday_of};
