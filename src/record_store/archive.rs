//! Archive management for reset logs
//!
//! Resetting the ledger never deletes data: the active log is moved to
//! `archive/records_<first>_to_<last>.jsonl` and a new log is started.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::types::Record;

use super::recovery::read_records;
use super::store::{PersistenceError, RecordStoreConfig, StoreResult};

/// Archive directory name, relative to the data directory
pub(crate) const ARCHIVE_DIR: &str = "archive";

/// Information about an archived log
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub size: u64,
    pub record_count: usize,
}

/// Move the active log into the archive directory
///
/// `records` is the materialized content of the log, used to name the
/// archive. Returns `None` (and leaves the log alone) when it is empty.
pub(crate) fn archive_log(
    config: &RecordStoreConfig,
    records: &[Record],
) -> StoreResult<Option<ArchiveInfo>> {
    let (first, last) = match (records.first(), records.last()) {
        (Some(first), Some(last)) => (first.id, last.id),
        _ => return Ok(None),
    };

    let archive_path = move_to_archive(
        &config.log_path(),
        &config.archive_dir(),
        &format!("records_{}_to_{}", first, last),
    )?;

    // The log is already moved; a failed stat must not report otherwise.
    let size = fs::metadata(&archive_path).map(|m| m.len()).unwrap_or(0);

    Ok(Some(ArchiveInfo {
        path: archive_path,
        size,
        record_count: records.len(),
    }))
}

/// Rename `log_path` to `<archive_dir>/<stem>.jsonl`, adding a numeric
/// suffix when that name is taken
///
/// Fails only before the rename, so on error the log is still in place.
fn move_to_archive(log_path: &Path, archive_dir: &Path, stem: &str) -> StoreResult<PathBuf> {
    fs::create_dir_all(archive_dir).map_err(|e| {
        PersistenceError::io(
            format!("failed to create archive directory {}", archive_dir.display()),
            e,
        )
    })?;

    let mut archive_path = archive_dir.join(format!("{}.jsonl", stem));
    let mut suffix = 1;
    while archive_path.exists() {
        archive_path = archive_dir.join(format!("{}.{}.jsonl", stem, suffix));
        suffix += 1;
    }

    fs::rename(log_path, &archive_path).map_err(|e| {
        PersistenceError::io(
            format!("failed to move {} to archive", log_path.display()),
            e,
        )
    })?;

    Ok(archive_path)
}

/// Move a log whose first line is not a known header out of the way
///
/// The file lands in the archive directory next to the log as
/// `records_unrecognized_<utc time>.jsonl` and is left untouched.
pub(crate) fn set_aside_unrecognized(log_path: &Path) -> StoreResult<PathBuf> {
    let archive_dir = log_path
        .parent()
        .map(|dir| dir.join(ARCHIVE_DIR))
        .unwrap_or_else(|| PathBuf::from(ARCHIVE_DIR));
    let stem = format!("records_unrecognized_{}", Utc::now().format("%Y%m%dT%H%M%S"));
    move_to_archive(log_path, &archive_dir, &stem)
}

/// List archived logs, oldest name first
pub fn list_archives(config: &RecordStoreConfig) -> StoreResult<Vec<ArchiveInfo>> {
    let archive_dir = config.archive_dir();

    if !archive_dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&archive_dir)
        .map_err(|e| PersistenceError::io("failed to list archive directory", e))?;

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PersistenceError::io("failed to read archive entry", e))?;
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            let size = entry
                .metadata()
                .map_err(|e| PersistenceError::io("failed to stat archive", e))?
                .len();
            let record_count = read_records(&path)?.len();

            archives.push(ArchiveInfo {
                path,
                size,
                record_count,
            });
        }
    }

    archives.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Capability;
    use crate::record_store::RecordStore;
    use crate::types::RecordDraft;
    use tempfile::TempDir;

    #[test]
    fn test_list_archives_after_resets() {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::open_dir(temp_dir.path()).unwrap();
        let cap = Capability::new("admin").unwrap();

        store.append(&cap, RecordDraft::new("A", 1, "Received")).unwrap();
        store.reset().unwrap();
        store.append(&cap, RecordDraft::new("B", 1, "Received")).unwrap();
        store.append(&cap, RecordDraft::new("C", 1, "Received")).unwrap();
        store.reset().unwrap();

        let archives = list_archives(store.config()).unwrap();
        assert_eq!(archives.len(), 2);
        assert_eq!(archives[0].record_count, 1);
        assert_eq!(archives[1].record_count, 2);
        assert!(archives[1].path.ends_with("records_1_to_2.jsonl"));
    }

    #[test]
    fn test_list_archives_without_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = RecordStoreConfig::new(temp_dir.path());
        assert!(list_archives(&config).unwrap().is_empty());
    }
}
