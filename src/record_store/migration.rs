//! Legacy CSV import
//!
//! The previous entry tool appended rows to `stock_data.csv`:
//!
//! ```text
//! Date,Item,Quantity,Status,Notes
//! 2024-05-02 14:03:11,iPhone 15,4,Received,
//! ```
//!
//! The importer replays those rows into the record log, keeping their
//! original dates, then leaves a `<file>.imported` copy as a marker so the
//! same file is never imported twice. Rows already in the log from an
//! earlier (possibly interrupted) import are matched and not appended again.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::Capability;
use crate::types::{Record, RecordDraft, Status, TIMESTAMP_DISPLAY_FORMAT};
use crate::validation::{validate_draft, ValidDraft};

use super::store::{PersistenceError, RecordStore, StoreError, StoreResult};

/// Actor recorded on imported rows
pub const LEGACY_ACTOR: &str = "legacy-import";

/// Result of an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub rows_read: usize,
    pub imported: usize,
    pub skipped: usize,
    /// Rows found in the log from an earlier import
    pub already_present: usize,
    /// The marker file existed, nothing was read
    pub already_imported: bool,
}

#[derive(Debug, Deserialize)]
struct LegacyRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Item")]
    item: String,
    #[serde(rename = "Quantity")]
    quantity: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Notes", default)]
    notes: Option<String>,
}

/// Parse a legacy quantity ("4", or "4.0" as written by spreadsheet tools)
fn parse_quantity(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(q) = raw.parse::<i64>() {
        return Some(q);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|q| q.fract() == 0.0 && q.abs() < i64::MAX as f64)
        .map(|q| q as i64)
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_DISPLAY_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Identity of an imported row, without its timestamp
#[derive(Debug, PartialEq, Eq, Hash)]
struct RowKey {
    item: String,
    quantity: u64,
    status: Status,
    notes: Option<String>,
}

impl RowKey {
    fn of_record(record: &Record) -> Self {
        Self {
            item: record.item.clone(),
            quantity: record.quantity,
            status: record.status,
            notes: record.notes.clone(),
        }
    }

    fn of_draft(valid: &ValidDraft) -> Self {
        Self {
            item: valid.item.clone(),
            quantity: valid.quantity,
            status: valid.status,
            notes: valid.notes.clone(),
        }
    }
}

/// Previously imported records, per key, in log order
fn imported_so_far(records: &[Record]) -> HashMap<RowKey, VecDeque<DateTime<Utc>>> {
    let mut seen: HashMap<RowKey, VecDeque<DateTime<Utc>>> = HashMap::new();
    for record in records.iter().filter(|r| r.actor == LEGACY_ACTOR) {
        seen.entry(RowKey::of_record(record))
            .or_default()
            .push_back(record.timestamp);
    }
    seen
}

/// Imports legacy CSV files into a record store
pub struct LegacyImporter<'a> {
    store: &'a RecordStore,
    capability: Capability,
}

impl<'a> LegacyImporter<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self {
            store,
            capability: Capability::trusted(LEGACY_ACTOR),
        }
    }

    /// Path of the marker written after a successful import
    pub fn marker_path(csv_path: &Path) -> PathBuf {
        let mut name = csv_path.as_os_str().to_os_string();
        name.push(".imported");
        PathBuf::from(name)
    }

    /// Import every valid row of `csv_path`
    ///
    /// Rows with an unreadable date, a non-positive quantity or an unknown
    /// status are skipped and counted. Storage failures abort the import.
    pub fn import<P: AsRef<Path>>(&self, csv_path: P) -> StoreResult<ImportResult> {
        let csv_path = csv_path.as_ref();
        let marker = Self::marker_path(csv_path);

        if marker.exists() {
            info!(path = %csv_path.display(), "legacy file already imported");
            return Ok(ImportResult {
                already_imported: true,
                ..Default::default()
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Fields)
            .from_path(csv_path)
            .map_err(PersistenceError::from)?;

        let mut result = ImportResult::default();
        let mut seen = imported_so_far(&self.store.load_all());

        for (index, row) in reader.deserialize::<LegacyRow>().enumerate() {
            result.rows_read += 1;
            // Line 1 is the CSV header.
            let line = index + 2;

            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(line, error = %e, "skipping unreadable legacy row");
                    result.skipped += 1;
                    continue;
                }
            };

            let (timestamp, quantity) = match (parse_date(&row.date), parse_quantity(&row.quantity)) {
                (Some(ts), Some(q)) => (ts, q),
                _ => {
                    warn!(line, date = %row.date, quantity = %row.quantity, "skipping legacy row");
                    result.skipped += 1;
                    continue;
                }
            };

            let mut draft = RecordDraft::new(row.item, quantity, row.status);
            draft.notes = row.notes;

            let valid = match validate_draft(draft.clone(), LEGACY_ACTOR) {
                Ok(valid) => valid,
                Err(e) => {
                    warn!(line, error = %e, "skipping invalid legacy row");
                    result.skipped += 1;
                    continue;
                }
            };

            // Stored timestamps are only ever clamped upwards.
            if let Some(queue) = seen.get_mut(&RowKey::of_draft(&valid)) {
                if queue.front().map_or(false, |stored| *stored >= timestamp) {
                    queue.pop_front();
                    result.already_present += 1;
                    continue;
                }
            }

            match self.store.append_record(&self.capability, draft, Some(timestamp)) {
                Ok(_) => result.imported += 1,
                Err(StoreError::Validation(e)) => {
                    warn!(line, error = %e, "skipping invalid legacy row");
                    result.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        fs::copy(csv_path, &marker).map_err(|e| {
            PersistenceError::io(format!("failed to write import marker {}", marker.display()), e)
        })?;

        info!(
            path = %csv_path.display(),
            imported = result.imported,
            skipped = result.skipped,
            already_present = result.already_present,
            "legacy import finished"
        );
        Ok(result)
    }
}
