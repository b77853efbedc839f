//! Mileage Client - adapters for the external systems of the mileage sync.
//!
//! This crate provides:
//!
//! - [`soap`] - the `wsMileageReport` SOAP client ([`MileageSource`](mileage_core::traits::MileageSource))
//! - [`extract`] - XML record extraction ([`RecordExtractor`](mileage_core::traits::RecordExtractor))
//! - [`mail`] - SMTP summary delivery ([`Notifier`](mileage_core::traits::Notifier))
//!
//! # Overview
//!
//! The adapters handle request building, response parsing and error mapping
//! into [`AppError`](mileage_core::AppError) for their respective systems.

pub mod extract;
pub mod mail;
pub mod soap;

// Re-export main client types
pub use extract::{FieldAliases, XmlRecordExtractor};
pub use mail::{NoopNotifier, SmtpNotifier};
pub use soap::SoapClient;
