//! Aggregation views
//!
//! Pure projections of a record set, recomputed on every call. Maps are
//! sparse (keys only for values that occur) and ordered, so repeated calls on
//! the same snapshot produce identical output.

use std::collections::BTreeMap;

use crate::types::{Record, Status, StockSummary};

/// Number of records per status
pub fn count_by_status(records: &[Record]) -> BTreeMap<Status, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.status).or_insert(0) += 1;
    }
    counts
}

/// Total quantity per item
pub fn sum_quantity_by_item(records: &[Record]) -> BTreeMap<String, u64> {
    let mut sums: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        let total = sums.entry(record.item.clone()).or_insert(0);
        *total = total.saturating_add(record.quantity);
    }
    sums
}

/// Totals plus both projections, as served to chart widgets
pub fn summarize(records: &[Record]) -> StockSummary {
    StockSummary {
        total_records: records.len(),
        total_quantity: records
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.quantity)),
        by_status: count_by_status(records),
        by_item: sum_quantity_by_item(records),
    }
}
