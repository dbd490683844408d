//! Record Store Module
//!
//! Durable persistence for the stock ledger:
//! - `RecordStore`: append-only log with serialized writers and snapshot reads
//! - `recover` / `scan_bytes`: crash recovery of a torn log tail
//! - `archive_log` / `list_archives`: administrative reset into `archive/`
//! - `StatsCollector`: storage statistics
//! - `LegacyImporter`: one-time import of the old `stock_data.csv`
//! - `export_csv`: spreadsheet export
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌──────────┐    ┌──────────┐    ┌───────────────┐    ┌──────────────┐
//! │ append() │───►│ validate │───►│ writer lock   │───►│ write_all +  │
//! │ + actor  │    │ draft    │    │ id, timestamp │    │ sync_data    │
//! └──────────┘    └──────────┘    └───────────────┘    └──────┬───────┘
//!                                                             │ ok
//!                                          publish to snapshot ◄┘
//!
//! Read Path (Startup):
//! ┌────────────────┐    ┌──────────────────┐    ┌────────────────┐
//! │ read header    │───►│ decode records   │───►│ truncate torn  │───► Ready!
//! │ (write if none)│    │ until torn tail  │    │ tail, fsync    │
//! └────────────────┘    └──────────────────┘    └────────────────┘
//! ```

mod archive;
mod export;
mod migration;
mod recovery;
mod stats;
mod store;

pub use archive::{list_archives, ArchiveInfo};
pub use export::export_csv;
pub use migration::{ImportResult, LegacyImporter, LEGACY_ACTOR};
pub use recovery::{read_records, scan_bytes, HeaderState, LogScan, RecoveryReport};
pub use stats::{StatsCollector, StoreStats};
pub use store::{PersistenceError, RecordStore, RecordStoreConfig, StoreError, StoreResult};
