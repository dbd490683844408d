//! Validation for submitted records and the item catalog
//!
//! Record validation is strict and runs inside the store before any write.
//! The catalog check is an upstream concern applied by the entry surface.

mod catalog;
mod record;

pub use catalog::{ItemCatalog, STANDARD_ITEMS};
pub use record::{validate_draft, ValidDraft, ValidationError};
