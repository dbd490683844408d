//! Stock Ledger
//!
//! A warehouse stock-entry backend built around a durable append-only record
//! log, with in-memory filtering, aggregation views and a small JSON API.
//!
//! # Features
//!
//! - **Durable Appends**: every record is fsynced before it becomes visible
//! - **Crash Recovery**: a torn trailing write is cut off on open
//! - **Concurrent Writers**: appends are serialized, readers see whole records
//! - **Search**: free-text and per-field filters, parallel on large sets
//! - **Aggregations**: counts by status and quantity totals by item
//!
//! # Modules
//!
//! - `types`: Core data structures (Record, RecordDraft, Status, StockSummary)
//! - `validation`: Record validation and the item catalog
//! - `record_store`: Append log, recovery, archive, stats, CSV import/export
//! - `query`: Predicates and the filter engine
//! - `aggregate`: Summary projections
//! - `auth`: Access gate, capabilities and bearer tokens
//! - `api`: Axum HTTP surface
//! - `config`: Environment configuration and tracing setup
//!
//! # Example
//!
//! ```no_run
//! use stock_ledger::{Capability, Predicate, RecordDraft, RecordStore};
//! use stock_ledger::aggregate::sum_quantity_by_item;
//! use stock_ledger::query::filter;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RecordStore::open_dir("data")?;
//!     let staff = Capability::new("staff")?;
//!
//!     store.append(&staff, RecordDraft::new("iPhone 15", 4, "Received"))?;
//!
//!     let records = store.load_all();
//!     let iphones = filter(&records, &Predicate::text("iphone"));
//!     println!("{:?}", sum_quantity_by_item(&iphones));
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod api;
pub mod auth;
pub mod config;
pub mod query;
pub mod record_store;
pub mod types;
pub mod validation;

// Re-export commonly used items at crate root
pub use auth::{AccessGate, AuthError, Capability, StaticAccessGate, TokenIssuer};
pub use query::{filter, Predicate, QueryError};
pub use record_store::{PersistenceError, RecordStore, RecordStoreConfig, StoreError, StoreResult};
pub use types::{Record, RecordDraft, RecordId, Status, StockSummary};
pub use validation::{ItemCatalog, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
