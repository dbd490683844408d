//! Record Store - durable append-only stock ledger
//!
//! The store owns `records.jsonl`. Appends are serialized by a writer lock,
//! written as a single buffer, fsynced, and only then published to the
//! in-memory snapshot that readers clone.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::Capability;
use crate::types::{Record, RecordDraft, RecordId};
use crate::validation::{validate_draft, ValidationError};

use super::archive::{archive_log, ArchiveInfo, ARCHIVE_DIR};
use super::recovery::{self, next_id_after, RecoveredLog, RecoveryReport};

/// Configuration for the RecordStore
#[derive(Debug, Clone)]
pub struct RecordStoreConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl RecordStoreConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get path to records.jsonl
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("records.jsonl")
    }

    /// Get path to archive directory
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join(ARCHIVE_DIR)
    }
}

/// Result type for RecordStore operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in RecordStore operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record rejected before any durable write
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage medium failed or holds unusable data
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}

/// Failures of the durable log
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("log corrupted at line {line}: {reason}")]
    Corrupted { line: usize, reason: String },

    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PersistenceError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        PersistenceError::Io {
            context: context.into(),
            source,
        }
    }
}

/// File operations the writer needs from the active log
pub(crate) trait LogFile: Write + Send {
    fn set_len(&self, len: u64) -> io::Result<()>;
    fn sync_data(&self) -> io::Result<()>;
}

impl LogFile for File {
    fn set_len(&self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync_data(&self) -> io::Result<()> {
        File::sync_data(self)
    }
}

/// Writer half of the store, guarded by the append lock
struct LogWriter {
    file: Box<dyn LogFile>,
    /// Length of the log up to the last fsynced record
    committed_len: u64,
    next_id: RecordId,
    last_timestamp: Option<DateTime<Utc>>,
    /// Set when a failed append could not be rolled back
    needs_repair: bool,
    /// Set when `file` may no longer be the active log (interrupted reset)
    detached: bool,
}

impl LogWriter {
    fn from_recovered(recovered: RecoveredLog) -> (Self, Vec<Record>) {
        let writer = LogWriter {
            file: Box::new(recovered.file),
            committed_len: recovered.committed_len,
            next_id: next_id_after(&recovered.records),
            last_timestamp: recovered.records.last().map(|r| r.timestamp),
            needs_repair: false,
            detached: false,
        };
        (writer, recovered.records)
    }

    /// Timestamp for the next record, never earlier than the previous one
    fn stamp(&self, requested: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_timestamp {
            Some(last) if requested < last => last,
            _ => requested,
        }
    }

    fn roll_back(&mut self) {
        match self.file.set_len(self.committed_len) {
            Ok(()) => self.needs_repair = false,
            Err(e) => {
                warn!(error = %e, "failed to roll back partial append");
                self.needs_repair = true;
            }
        }
    }
}

/// The RecordStore manages the append-only record log
pub struct RecordStore {
    config: RecordStoreConfig,
    writer: Mutex<LogWriter>,
    records: RwLock<Vec<Record>>,
}

impl RecordStore {
    /// Open (or create) the store and recover its log
    pub fn open(config: RecordStoreConfig) -> StoreResult<Self> {
        let recovered = recovery::recover_log(&config.log_path())?;
        let (writer, records) = LogWriter::from_recovered(recovered);

        Ok(Self {
            config,
            writer: Mutex::new(writer),
            records: RwLock::new(records),
        })
    }

    /// Open the store in a data directory
    pub fn open_dir<P: AsRef<Path>>(data_dir: P) -> StoreResult<Self> {
        Self::open(RecordStoreConfig::new(data_dir))
    }

    /// Get the configuration
    pub fn config(&self) -> &RecordStoreConfig {
        &self.config
    }

    /// Path of the active log
    pub fn log_path(&self) -> PathBuf {
        self.config.log_path()
    }

    /// Re-run crash recovery against the file on disk
    ///
    /// Establishes the header if needed, cuts off an incomplete tail and
    /// reloads the in-memory snapshot. Safe to call repeatedly.
    pub fn recover(&self) -> StoreResult<RecoveryReport> {
        let mut writer = self.writer.lock();
        let recovered = recovery::recover_log(&self.config.log_path())?;
        let report = recovered.report.clone();

        let (fresh, records) = LogWriter::from_recovered(recovered);
        *writer = fresh;
        *self.records.write() = records;

        Ok(report)
    }

    /// Validate and durably append a record on behalf of `capability`
    ///
    /// Returns only after the record is fsynced; a record whose append failed
    /// is never visible to readers.
    pub fn append(&self, capability: &Capability, draft: RecordDraft) -> StoreResult<RecordId> {
        self.append_record(capability, draft, None).map(|r| r.id)
    }

    /// Like `append`, returning the stored record
    pub fn append_record(
        &self,
        capability: &Capability,
        draft: RecordDraft,
        requested_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Record> {
        let valid = validate_draft(draft, capability.actor())?;

        let mut writer = self.writer.lock();

        if writer.detached {
            return Err(PersistenceError::io(
                "log handle is detached after an interrupted reset; run recover",
                io::Error::new(io::ErrorKind::Other, "detached log"),
            )
            .into());
        }

        if writer.needs_repair {
            writer.roll_back();
            if writer.needs_repair {
                return Err(PersistenceError::io(
                    "log has an unrepaired partial append",
                    io::Error::new(io::ErrorKind::Other, "rollback failed"),
                )
                .into());
            }
        }

        let record = Record {
            id: writer.next_id,
            timestamp: writer.stamp(requested_at.unwrap_or_else(Utc::now)),
            item: valid.item,
            quantity: valid.quantity,
            status: valid.status,
            notes: valid.notes,
            actor: capability.actor().to_string(),
        };

        let mut line = record.to_json_line().map_err(PersistenceError::Encode)?;
        line.push('\n');

        if let Err(e) = writer.file.write_all(line.as_bytes()) {
            writer.roll_back();
            return Err(PersistenceError::io(
                format!("failed to write record {}", record.id),
                e,
            )
            .into());
        }

        if let Err(e) = writer.file.sync_data() {
            writer.roll_back();
            return Err(PersistenceError::io(
                format!("fsync failed after writing record {}", record.id),
                e,
            )
            .into());
        }

        writer.committed_len += line.len() as u64;
        writer.next_id = record.id.next();
        writer.last_timestamp = Some(record.timestamp);

        // Published while the writer lock is held so ids stay in file order.
        self.records.write().push(record.clone());

        debug!(id = %record.id, item = %record.item, actor = %record.actor, "record appended");
        Ok(record)
    }

    /// All records in append order (independent copies)
    pub fn load_all(&self) -> Vec<Record> {
        self.records.read().clone()
    }

    /// Full read of the log file, bypassing the in-memory snapshot
    pub fn scan_disk(&self) -> StoreResult<Vec<Record>> {
        recovery::read_records(&self.config.log_path())
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Id of the most recent record, if any
    pub fn last_id(&self) -> Option<RecordId> {
        self.records.read().last().map(|r| r.id)
    }

    /// Archive the current log and start an empty one
    ///
    /// Administrative operation; not reachable through the HTTP surface.
    /// Returns the archive written, or `None` if the log had no records.
    ///
    /// If a fresh log cannot be started, the archive is moved back. When even
    /// that fails, appends are refused until `recover` succeeds.
    pub fn reset(&self) -> StoreResult<Option<ArchiveInfo>> {
        self.reset_with(recovery::recover_log)
    }

    fn reset_with<F>(&self, start_log: F) -> StoreResult<Option<ArchiveInfo>>
    where
        F: FnOnce(&Path) -> StoreResult<RecoveredLog>,
    {
        let mut writer = self.writer.lock();
        let mut records = self.records.write();
        let log_path = self.config.log_path();

        let archived = archive_log(&self.config, &records)?;

        let recovered = match start_log(&log_path) {
            Ok(recovered) => recovered,
            Err(e) => {
                if let Some(archive) = &archived {
                    match fs::rename(&archive.path, &log_path) {
                        Ok(()) => warn!(error = %e, "reset failed, archive restored"),
                        Err(restore) => {
                            writer.detached = true;
                            warn!(
                                error = %e,
                                restore_error = %restore,
                                archive = %archive.path.display(),
                                "reset failed and archive could not be restored"
                            );
                        }
                    }
                }
                return Err(e);
            }
        };

        let (fresh, recovered_records) = LogWriter::from_recovered(recovered);
        *writer = fresh;
        *records = recovered_records;

        info!(
            archive = ?archived.as_ref().map(|a| a.path.display().to_string()),
            "record log reset"
        );
        Ok(archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (RecordStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::open_dir(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn staff() -> Capability {
        Capability::new("staff").unwrap()
    }

    #[test]
    fn test_open_writes_header() {
        let (store, _temp_dir) = create_test_store();
        let content = std::fs::read_to_string(store.log_path()).unwrap();
        assert!(content.starts_with("{\"type\":\"stock_log\""));
        assert_eq!(content.lines().count(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_and_load() {
        let (store, _temp_dir) = create_test_store();

        let id1 = store
            .append(&staff(), RecordDraft::new("iPhone 15", 5, "Received"))
            .unwrap();
        let id2 = store
            .append(
                &staff(),
                RecordDraft::new("Dell XPS", 2, "Damaged").with_notes("box crushed"),
            )
            .unwrap();

        assert_eq!(id1, RecordId(1));
        assert_eq!(id2, RecordId(2));

        let records = store.load_all();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item, "iPhone 15");
        assert_eq!(records[1].status, Status::Damaged);
        assert_eq!(records[1].notes.as_deref(), Some("box crushed"));
        assert_eq!(records[1].actor, "staff");
        assert_eq!(store.scan_disk().unwrap(), records);
    }

    #[test]
    fn test_validation_failure_leaves_log_untouched() {
        let (store, _temp_dir) = create_test_store();
        let before = std::fs::metadata(store.log_path()).unwrap().len();

        let err = store
            .append(&staff(), RecordDraft::new("iPhone 15", 0, "Received"))
            .unwrap_err();
        assert!(err.is_validation());

        let err = store
            .append(&staff(), RecordDraft::new("iPhone 15", 1, "Stolen"))
            .unwrap_err();
        assert!(err.is_validation());

        assert!(store.load_all().is_empty());
        assert_eq!(std::fs::metadata(store.log_path()).unwrap().len(), before);
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let (store, _temp_dir) = create_test_store();
        let now = Utc::now();

        let first = store
            .append_record(&staff(), RecordDraft::new("A", 1, "Received"), Some(now))
            .unwrap();
        let second = store
            .append_record(
                &staff(),
                RecordDraft::new("B", 1, "Received"),
                Some(now - Duration::hours(1)),
            )
            .unwrap();

        assert_eq!(second.timestamp, first.timestamp);
    }

    #[test]
    fn test_reopen_continues_ids() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = RecordStore::open_dir(temp_dir.path()).unwrap();
            store.append(&staff(), RecordDraft::new("A", 1, "Received")).unwrap();
            store.append(&staff(), RecordDraft::new("B", 2, "Delivered")).unwrap();
        }

        let store = RecordStore::open_dir(temp_dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        let id = store.append(&staff(), RecordDraft::new("C", 3, "Received")).unwrap();
        assert_eq!(id, RecordId(3));
    }

    #[test]
    fn test_recover_is_idempotent() {
        let (store, _temp_dir) = create_test_store();
        store.append(&staff(), RecordDraft::new("A", 1, "Received")).unwrap();

        let first = store.recover().unwrap();
        let second = store.recover().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.records, 1);
        assert_eq!(first.discarded_bytes, 0);
        assert!(!first.header_written);
    }

    #[test]
    fn test_reset_archives_and_clears() {
        let (store, _temp_dir) = create_test_store();
        store.append(&staff(), RecordDraft::new("A", 1, "Received")).unwrap();
        store.append(&staff(), RecordDraft::new("B", 1, "Received")).unwrap();

        let archive = store.reset().unwrap().unwrap();
        assert!(archive.path.exists());
        assert_eq!(archive.record_count, 2);
        assert!(store.is_empty());

        let id = store.append(&staff(), RecordDraft::new("C", 1, "Received")).unwrap();
        assert_eq!(id, RecordId(1));
        assert_eq!(store.scan_disk().unwrap().len(), 1);
    }

    #[test]
    fn test_reset_empty_log_writes_no_archive() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.reset().unwrap().is_none());
    }

    /// Log file that fails on demand; a failing write lands half its buffer
    struct FailingFile {
        inner: File,
        fail_writes: bool,
        fail_sync: bool,
        fail_set_len: bool,
    }

    impl FailingFile {
        fn new(path: &Path) -> Self {
            let inner = fs::OpenOptions::new().append(true).open(path).unwrap();
            Self {
                inner,
                fail_writes: false,
                fail_sync: false,
                fail_set_len: false,
            }
        }
    }

    impl Write for FailingFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                self.inner.write_all(&buf[..buf.len() / 2])?;
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl LogFile for FailingFile {
        fn set_len(&self, len: u64) -> io::Result<()> {
            if self.fail_set_len {
                return Err(io::Error::new(io::ErrorKind::Other, "read-only"));
            }
            self.inner.set_len(len)
        }

        fn sync_data(&self) -> io::Result<()> {
            if self.fail_sync {
                return Err(io::Error::new(io::ErrorKind::Other, "fsync failed"));
            }
            self.inner.sync_data()
        }
    }

    fn swap_file(store: &RecordStore, file: FailingFile) {
        store.writer.lock().file = Box::new(file);
    }

    fn log_len(store: &RecordStore) -> u64 {
        std::fs::metadata(store.log_path()).unwrap().len()
    }

    fn is_persistence(err: &StoreError) -> bool {
        matches!(err, StoreError::Persistence(_))
    }

    #[test]
    fn test_failed_write_is_rolled_back() {
        let (store, _temp_dir) = create_test_store();
        store.append(&staff(), RecordDraft::new("A", 1, "Received")).unwrap();
        let before = store.load_all();
        let len_before = log_len(&store);

        let mut file = FailingFile::new(&store.log_path());
        file.fail_writes = true;
        swap_file(&store, file);

        let err = store
            .append(&staff(), RecordDraft::new("B", 2, "Received"))
            .unwrap_err();
        assert!(is_persistence(&err));
        assert_eq!(store.load_all(), before);
        assert_eq!(log_len(&store), len_before);
        assert_eq!(store.writer.lock().committed_len, len_before);

        swap_file(&store, FailingFile::new(&store.log_path()));
        let id = store.append(&staff(), RecordDraft::new("B", 2, "Received")).unwrap();
        assert_eq!(id, RecordId(2));
        assert_eq!(store.scan_disk().unwrap(), store.load_all());
    }

    #[test]
    fn test_failed_sync_is_rolled_back() {
        let (store, _temp_dir) = create_test_store();
        let len_before = log_len(&store);

        let mut file = FailingFile::new(&store.log_path());
        file.fail_sync = true;
        swap_file(&store, file);

        let err = store
            .append(&staff(), RecordDraft::new("A", 1, "Received"))
            .unwrap_err();
        assert!(is_persistence(&err));
        assert!(store.is_empty());
        assert_eq!(log_len(&store), len_before);

        swap_file(&store, FailingFile::new(&store.log_path()));
        let id = store.append(&staff(), RecordDraft::new("A", 1, "Received")).unwrap();
        assert_eq!(id, RecordId(1));
    }

    #[test]
    fn test_unrepaired_append_blocks_until_rollback_succeeds() {
        let (store, _temp_dir) = create_test_store();
        let len_before = log_len(&store);

        let mut file = FailingFile::new(&store.log_path());
        file.fail_writes = true;
        file.fail_set_len = true;
        swap_file(&store, file);

        assert!(store
            .append(&staff(), RecordDraft::new("A", 1, "Received"))
            .is_err());
        assert!(store.writer.lock().needs_repair);
        assert!(log_len(&store) > len_before);

        // Still unable to truncate: refused before anything is written.
        let mut file = FailingFile::new(&store.log_path());
        file.fail_set_len = true;
        swap_file(&store, file);
        let partial_len = log_len(&store);
        let err = store
            .append(&staff(), RecordDraft::new("A", 1, "Received"))
            .unwrap_err();
        assert!(err.to_string().contains("unrepaired"));
        assert_eq!(log_len(&store), partial_len);

        swap_file(&store, FailingFile::new(&store.log_path()));
        let id = store.append(&staff(), RecordDraft::new("A", 1, "Received")).unwrap();
        assert_eq!(id, RecordId(1));
        assert_eq!(store.scan_disk().unwrap().len(), 1);
    }

    fn start_failure() -> StoreError {
        let cause = io::Error::new(io::ErrorKind::Other, "no space");
        PersistenceError::io("failed to start log", cause).into()
    }

    #[test]
    fn test_failed_reset_restores_archive() {
        let (store, _temp_dir) = create_test_store();
        store.append(&staff(), RecordDraft::new("A", 1, "Received")).unwrap();
        store.append(&staff(), RecordDraft::new("B", 1, "Received")).unwrap();

        let err = store.reset_with(|_| Err(start_failure())).unwrap_err();
        assert!(is_persistence(&err));

        assert_eq!(store.len(), 2);
        assert_eq!(store.scan_disk().unwrap().len(), 2);
        let archived = std::fs::read_dir(store.config().archive_dir()).unwrap().count();
        assert_eq!(archived, 0);

        let id = store.append(&staff(), RecordDraft::new("C", 1, "Received")).unwrap();
        assert_eq!(id, RecordId(3));
        assert_eq!(store.scan_disk().unwrap().len(), 3);
    }

    #[test]
    fn test_unrestorable_reset_refuses_appends_until_recover() {
        let (store, temp_dir) = create_test_store();
        store.append(&staff(), RecordDraft::new("A", 1, "Received")).unwrap();

        let archive_dir = store.config().archive_dir();
        let elsewhere = temp_dir.path().join("elsewhere.jsonl");
        let err = store
            .reset_with(|_| {
                let archived = std::fs::read_dir(&archive_dir)
                    .unwrap()
                    .next()
                    .unwrap()
                    .unwrap()
                    .path();
                std::fs::rename(archived, &elsewhere).unwrap();
                Err(start_failure())
            })
            .unwrap_err();
        assert!(is_persistence(&err));
        assert!(!store.log_path().exists());

        let err = store
            .append(&staff(), RecordDraft::new("B", 1, "Received"))
            .unwrap_err();
        assert!(err.to_string().contains("detached"));
        assert!(!store.log_path().exists());

        store.recover().unwrap();
        assert!(store.is_empty());
        let id = store.append(&staff(), RecordDraft::new("B", 1, "Received")).unwrap();
        assert_eq!(id, RecordId(1));
        assert_eq!(std::fs::read_to_string(elsewhere).unwrap().lines().count(), 2);
    }
}
