//! Summary projection used for dashboards and charts

use std::collections::BTreeMap;

use serde::Serialize;

use super::Status;

/// Aggregated view over a set of records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    pub total_records: usize,
    pub total_quantity: u64,
    pub by_status: BTreeMap<Status, usize>,
    pub by_item: BTreeMap<String, u64>,
}
