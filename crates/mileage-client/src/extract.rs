//! XML record extraction for `wsMileageReport` responses.
//!
//! Entries and fields are matched by local name only, so the extractor works
//! whatever namespace prefixes the service decides to emit.

use mileage_core::error::AppError;
use mileage_core::models::{MileageRecord, RawDocument};
use mileage_core::traits::RecordExtractor;
use roxmltree::{Document, Node};
use tracing::debug;

/// Element names the extractor looks for.
///
/// For each field the aliases are tried in order; the first alias whose first
/// matching element has non-blank text wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAliases {
    /// Local name of one report entry.
    pub entry: String,
    pub device_id: Vec<String>,
    pub license_plate: Vec<String>,
    pub mileage: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            entry: "MileageL".to_string(),
            device_id: names(&["DeviceId", "DeviceID"]),
            license_plate: names(&["License_Plate", "LicensePlate"]),
            mileage: names(&["Mileage", "KM", "Km"]),
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Extracts [`MileageRecord`]s from a report document.
///
/// # Examples
///
/// ```
/// use mileage_client::XmlRecordExtractor;
/// use mileage_core::RawDocument;
/// use mileage_core::traits::RecordExtractor;
///
/// let xml = r#"<r><MileageL><DeviceId>A1</DeviceId><Km>120</Km></MileageL></r>"#;
/// let records = XmlRecordExtractor::default()
///     .extract(&RawDocument::from(xml))
///     .unwrap();
/// assert_eq!(records[0].device_id, "A1");
/// assert_eq!(records[0].mileage, Some(120));
/// ```
#[derive(Debug, Clone, Default)]
pub struct XmlRecordExtractor {
    aliases: FieldAliases,
}

impl XmlRecordExtractor {
    pub fn new(aliases: FieldAliases) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &FieldAliases {
        &self.aliases
    }

    fn read_entry(&self, index: usize, entry: Node<'_, '_>) -> Option<MileageRecord> {
        let Some(device_id) = first_text(entry, &self.aliases.device_id) else {
            debug!(index, "Entry without device id dropped");
            return None;
        };
        let license_plate = first_text(entry, &self.aliases.license_plate);
        let mileage = first_text(entry, &self.aliases.mileage).and_then(|raw| {
            raw.parse::<i64>()
                .inspect_err(|e| debug!(index, raw = %raw, error = %e, "Unparsable mileage"))
                .ok()
        });

        Some(MileageRecord {
            device_id,
            license_plate,
            mileage,
        })
    }
}

impl RecordExtractor for XmlRecordExtractor {
    fn extract(&self, document: &RawDocument) -> Result<Vec<MileageRecord>, AppError> {
        let xml = Document::parse(document.as_str())
            .map_err(|e| AppError::MalformedDocument(e.to_string()))?;

        let entry_name = self.aliases.entry.as_str();
        let records: Vec<MileageRecord> = xml
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == entry_name)
            .enumerate()
            .filter_map(|(index, entry)| self.read_entry(index, entry))
            .collect();

        debug!(count = records.len(), "Report entries extracted");
        Ok(records)
    }
}

/// Returns the trimmed text of the first descendant matching an alias.
///
/// Only the first element per alias is considered; a blank one makes the
/// search fall through to the next alias.
fn first_text(entry: Node<'_, '_>, aliases: &[String]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        let node = entry
            .descendants()
            .skip(1)
            .find(|n| n.is_element() && n.tag_name().name() == alias)?;
        node.text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
    })
}
