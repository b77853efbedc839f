//! Mileage DB - PostgreSQL persistence for the mileage sync.
//!
//! # Overview
//!
//! The main components are:
//! - [`MileageRepository`] - pool owner, schema setup and read queries
//! - [`PgSession`] - one transaction per sync run, implementing
//!   [`StoreSession`](mileage_core::traits::StoreSession)

mod repository;

pub use repository::{MileageRepository, PgSession, SCHEMA_SQL, StoredMileage};
