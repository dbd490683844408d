//! CSV export in the legacy spreadsheet layout

use std::io::Write;

use serde::Serialize;

use crate::types::Record;

use super::store::{PersistenceError, StoreResult};

#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Item")]
    item: &'a str,
    #[serde(rename = "Quantity")]
    quantity: u64,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Notes")]
    notes: &'a str,
    #[serde(rename = "Actor")]
    actor: &'a str,
}

impl<'a> From<&'a Record> for ExportRow<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            date: record.display_timestamp(),
            item: &record.item,
            quantity: record.quantity,
            status: record.status.label(),
            notes: record.notes.as_deref().unwrap_or(""),
            actor: &record.actor,
        }
    }
}

/// Write `records` as CSV with a `Date,Item,Quantity,Status,Notes,Actor` header
///
/// The header is written even when `records` is empty.
pub fn export_csv<W: Write>(records: &[Record], writer: W) -> StoreResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer
        .write_record(["Date", "Item", "Quantity", "Status", "Notes", "Actor"])
        .map_err(PersistenceError::from)?;

    for record in records {
        csv_writer
            .serialize(ExportRow::from(record))
            .map_err(PersistenceError::from)?;
    }

    csv_writer
        .flush()
        .map_err(|e| PersistenceError::io("failed to flush CSV export", e))?;
    Ok(())
}
