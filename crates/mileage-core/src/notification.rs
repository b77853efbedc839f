//! Rendering of the run summary sent through a [`Notifier`](crate::traits::Notifier).
//!
//! The body is a small HTML document: heading, date, counters, an error line
//! for failed runs and a table of the records accepted by the run.

use crate::models::MileageRecord;
use crate::sync::SyncRun;

/// Placeholder for values the report did not carry.
const MISSING: &str = "-";

/// Builds the subject line, e.g. `ATS Mileage | 2024-03-15 | 12 records`.
///
/// Failed runs get an ` | ERROR` suffix.
pub fn render_subject(prefix: &str, run: &SyncRun) -> String {
    let mut subject = format!(
        "{} | {} | {} records",
        prefix,
        run.target_date().format("%Y-%m-%d"),
        run.inserted_count()
    );
    if !run.is_success() {
        subject.push_str(" | ERROR");
    }
    subject
}

/// Builds the HTML summary body for `run`.
pub fn render_html(prefix: &str, run: &SyncRun) -> String {
    let date = run.target_date().format("%Y-%m-%d");
    let mut html = String::with_capacity(512 + run.inserted_count() * 96);

    html.push_str(&format!(
        "<h3>{} daily synchronization</h3>\n",
        escape_markup(prefix)
    ));
    html.push_str(&format!("<p><b>Date:</b> {}</p>\n", date));
    html.push_str(&format!(
        "<ul>\n  <li><b>Inserted:</b> {}</li>\n  <li><b>Skipped (duplicate):</b> {}</li>\n  <li><b>Errors:</b> {}</li>\n</ul>\n",
        run.inserted_count(),
        run.skipped_count(),
        run.error_count()
    ));

    if let Some(failure) = run.failure() {
        html.push_str(&format!(
            "<p><b>Error ({}):</b> {}</p>\n",
            failure.phase,
            escape_markup(&failure.message)
        ));
        if run.inserted_count() > 0 {
            html.push_str(
                "<p>The transaction was rolled back; the rows below were not stored.</p>\n",
            );
        }
    }

    html.push_str("<table border=\"1\" cellpadding=\"6\" cellspacing=\"0\">\n");
    html.push_str("  <tr><th>Plate</th><th>DeviceId</th><th>KM</th></tr>\n");
    for record in run.inserted_records() {
        html.push_str(&format_row(record));
    }
    html.push_str("</table>\n");

    html
}

fn format_row(record: &MileageRecord) -> String {
    let plate = record
        .license_plate
        .as_deref()
        .map(escape_markup)
        .unwrap_or_else(|| MISSING.to_string());
    let km = record
        .mileage
        .map(|km| km.to_string())
        .unwrap_or_else(|| MISSING.to_string());

    format!(
        "  <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        plate,
        escape_markup(&record.device_id),
        km
    )
}

/// Escapes the five XML/HTML special characters.
///
/// Shared by the HTML summary and the SOAP envelope builder.
///
/// # Examples
///
/// ```
/// use mileage_core::notification::escape_markup;
///
/// assert_eq!(escape_markup("a<b & 'c'"), "a&lt;b &amp; &apos;c&apos;");
/// ```
pub fn escape_markup(s: &str) -> String {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
