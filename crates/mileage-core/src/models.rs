//! Domain models shared by the sync pipeline and its collaborators.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

/// One mileage observation extracted from the report service.
///
/// Created by a [`RecordExtractor`](crate::traits::RecordExtractor) from one
/// report entry and read-only afterward. A record whose `device_id` is blank
/// is invalid and must never reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MileageRecord {
    /// Tracking device identifier (required, non-empty).
    pub device_id: String,
    /// Vehicle license plate, when the report carries one.
    pub license_plate: Option<String>,
    /// Odometer reading in kilometers, when present and numeric.
    pub mileage: Option<i64>,
}

impl MileageRecord {
    /// Creates a record with only a device identifier.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            license_plate: None,
            mileage: None,
        }
    }

    pub fn with_plate(mut self, plate: impl Into<String>) -> Self {
        self.license_plate = Some(plate.into());
        self
    }

    pub fn with_mileage(mut self, km: i64) -> Self {
        self.mileage = Some(km);
        self
    }

    /// Returns true if the record carries a usable device identifier.
    pub fn is_valid(&self) -> bool {
        !self.device_id.trim().is_empty()
    }
}

/// Unparsed response body returned by the report service for one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument(String);

impl RawDocument {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the body in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for RawDocument {
    fn from(body: String) -> Self {
        Self(body)
    }
}

impl From<&str> for RawDocument {
    fn from(body: &str) -> Self {
        Self(body.to_string())
    }
}

/// Inclusive timestamp range covering one calendar day, in local time.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use mileage_core::models::ReportWindow;
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// let window = ReportWindow::for_day(day);
/// assert_eq!(window.start_param(), "2024-03-15T00:00:00");
/// assert_eq!(window.end_param(), "2024-03-15T23:59:59");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ReportWindow {
    /// Timestamp format expected by the report service.
    pub const WIRE_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S";

    /// Builds the `00:00:00`..=`23:59:59` window for `date`.
    pub fn for_day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN);
        Self {
            start,
            end: start + TimeDelta::seconds(86_399),
        }
    }

    /// The calendar day this window covers.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn start_param(&self) -> String {
        self.start.format(Self::WIRE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(Self::WIRE_FORMAT).to_string()
    }
}
