//! Record Store Statistics
//!
//! Storage-level numbers for the admin dashboard and startup logs:
//! record counts, file sizes, archive totals and the covered time range.

use std::fs;
use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::archive::list_archives;
use super::store::{PersistenceError, RecordStore, StoreResult};

/// Statistics about the Record Store
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Records in the active log
    pub record_count: usize,
    /// Size of the active log in bytes
    pub log_size: u64,
    /// Number of archive files
    pub archive_file_count: usize,
    /// Records held in archives
    pub archived_record_count: usize,
    /// Total size of archives in bytes
    pub archive_size: u64,
    /// Id of the newest record
    pub last_id: Option<u64>,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl StoreStats {
    /// Calculate total storage size
    pub fn total_size(&self) -> u64 {
        self.log_size + self.archive_size
    }

    /// Format size in human-readable format
    pub fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.2} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.2} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.2} KB", bytes as f64 / KB as f64)
        } else {
            format!("{} B", bytes)
        }
    }
}

/// Collector for Record Store statistics
pub struct StatsCollector<'a> {
    store: &'a RecordStore,
}

impl<'a> StatsCollector<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Collect all statistics
    pub fn collect(&self) -> StoreResult<StoreStats> {
        let records = self.store.load_all();
        let mut stats = StoreStats {
            record_count: records.len(),
            last_id: records.last().map(|r| r.id.value()),
            first_timestamp: records.first().map(|r| r.timestamp),
            last_timestamp: records.last().map(|r| r.timestamp),
            ..Default::default()
        };

        stats.log_size = match fs::metadata(self.store.log_path()) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(PersistenceError::io("failed to stat record log", e).into()),
        };

        let archives = list_archives(self.store.config())?;
        stats.archive_file_count = archives.len();
        stats.archived_record_count = archives.iter().map(|a| a.record_count).sum();
        stats.archive_size = archives.iter().map(|a| a.size).sum();

        Ok(stats)
    }
}
