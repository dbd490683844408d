//! Data types for the stock ledger
//!
//! This module contains the core data structures shared by the store,
//! query engine, aggregation views and the HTTP layer.

mod header;
mod record;
mod summary;

pub use header::{LogHeader, LOG_FORMAT_VERSION, LOG_HEADER_TYPE, RECORD_FIELDS};
pub use record::{Record, RecordDraft, RecordId, Status, UnknownStatus, TIMESTAMP_DISPLAY_FORMAT};
pub use summary::StockSummary;
