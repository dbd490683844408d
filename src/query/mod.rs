//! Query/filter engine over materialized records
//!
//! A `Predicate` is either a free-text token, a set of field constraints, or
//! a conjunction of both. `filter` applies it to a snapshot taken from
//! `RecordStore::load_all`, preserving append order.

mod filter;
mod predicate;

use thiserror::Error;

pub use filter::{filter, PARALLEL_FILTER_THRESHOLD};
pub use predicate::{Bounds, FieldFilter, Predicate, TextQuery};

/// Errors from parsing structured predicates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown filter field '{0}'")]
    UnknownField(String),

    #[error("invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl QueryError {
    fn invalid(field: &str, value: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
