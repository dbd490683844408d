//! Order-preserving filter

use rayon::prelude::*;

use crate::types::Record;

use super::Predicate;

/// Record count above which filtering runs on the rayon pool
pub const PARALLEL_FILTER_THRESHOLD: usize = 1000;

/// Records matching `predicate`, in their original order
///
/// No match yields an empty vector.
pub fn filter(records: &[Record], predicate: &Predicate) -> Vec<Record> {
    if predicate.is_all() {
        return records.to_vec();
    }

    if records.len() > PARALLEL_FILTER_THRESHOLD {
        records
            .par_iter()
            .filter(|r| predicate.matches(r))
            .cloned()
            .collect()
    } else {
        records
            .iter()
            .filter(|r| predicate.matches(r))
            .cloned()
            .collect()
    }
}
