//! Log scanning and crash recovery
//!
//! A log is a header line followed by one JSON record per line. Every line
//! is written with a single `write_all` + fsync, so after a crash the only
//! damage that can exist is at the tail: a fragment without its newline, or a
//! final line that does not decode. Both are discarded. Anything malformed
//! *before* a valid record is real corruption and is reported, never skipped.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::types::{LogHeader, Record, RecordId};

use super::archive::set_aside_unrecognized;
use super::store::{PersistenceError, StoreResult};

/// What the first line of the log looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    /// Empty file
    Missing,
    /// Header write was interrupted (no line terminator yet)
    Torn,
    /// Supported header
    Valid,
    /// First line is not a header this build understands
    Unrecognized,
}

/// Result of scanning a log image
#[derive(Debug, Clone)]
pub struct LogScan {
    pub header: HeaderState,
    /// Complete, decoded records in file order
    pub records: Vec<Record>,
    /// Byte length of the header plus all complete records
    pub valid_len: u64,
    /// Byte length of the scanned image
    pub total_len: u64,
}

impl LogScan {
    /// Bytes past the last complete record
    pub fn trailing_bytes(&self) -> u64 {
        self.total_len - self.valid_len
    }

    fn without_records(header: HeaderState, total_len: u64) -> Self {
        Self {
            header,
            records: Vec::new(),
            valid_len: 0,
            total_len,
        }
    }
}

/// Outcome of `recover`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records surfaced after recovery
    pub records: usize,
    /// Bytes of incomplete tail that were cut off
    pub discarded_bytes: u64,
    /// Whether a fresh header had to be written
    pub header_written: bool,
    /// Where a log without a recognized header was moved
    pub set_aside: Option<PathBuf>,
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Whether a non-blank, newline-terminated line starts at or after `start`
fn has_complete_line_after(data: &[u8], start: usize) -> bool {
    let rest = &data[start.min(data.len())..];
    let mut segments: Vec<&[u8]> = rest.split(|b| *b == b'\n').collect();
    // The last segment has no terminator.
    segments.pop();
    segments.into_iter().any(|line| !is_blank(line))
}

fn decode_line(line: &[u8]) -> Result<Record, String> {
    let text = std::str::from_utf8(line).map_err(|e| e.to_string())?;
    let record =
        Record::from_json_line(text.trim_end_matches('\r')).map_err(|e| e.to_string())?;
    check_persisted(&record)?;
    Ok(record)
}

/// Invariants every appended record satisfies
fn check_persisted(record: &Record) -> Result<(), String> {
    if record.quantity == 0 {
        return Err(format!("record {} has quantity 0", record.id));
    }
    if record.item.trim().is_empty() {
        return Err(format!("record {} has an empty item", record.id));
    }
    if record.actor.trim().is_empty() {
        return Err(format!("record {} has an empty actor", record.id));
    }
    Ok(())
}

/// Scan a complete log image
///
/// Returns `PersistenceError::Corrupted` for a malformed line followed by
/// further records, or for ids that do not strictly increase.
pub fn scan_bytes(data: &[u8]) -> StoreResult<LogScan> {
    let total_len = data.len() as u64;

    if data.is_empty() {
        return Ok(LogScan::without_records(HeaderState::Missing, 0));
    }

    let header_end = match data.iter().position(|b| *b == b'\n') {
        Some(pos) => pos,
        None => return Ok(LogScan::without_records(HeaderState::Torn, total_len)),
    };

    let header_ok = std::str::from_utf8(&data[..header_end])
        .ok()
        .and_then(|line| LogHeader::from_json_line(line.trim_end_matches('\r')).ok())
        .map(|header| header.is_supported())
        .unwrap_or(false);

    if !header_ok {
        return Ok(LogScan::without_records(HeaderState::Unrecognized, total_len));
    }

    let mut records: Vec<Record> = Vec::new();
    let mut offset = header_end + 1;
    let mut valid_len = offset;
    // Line 1 is the header.
    let mut line_no = 1usize;

    while offset < data.len() {
        let line_end = match data[offset..].iter().position(|b| *b == b'\n') {
            Some(pos) => offset + pos,
            // Trailing fragment from an interrupted append.
            None => break,
        };
        line_no += 1;
        let line = &data[offset..line_end];
        let next = line_end + 1;

        if is_blank(line) {
            offset = next;
            valid_len = next;
            continue;
        }

        match decode_line(line) {
            Ok(record) => {
                if let Some(prev) = records.last() {
                    if record.id <= prev.id {
                        return Err(PersistenceError::Corrupted {
                            line: line_no,
                            reason: format!(
                                "record id {} does not follow {}",
                                record.id, prev.id
                            ),
                        }
                        .into());
                    }
                }
                records.push(record);
                offset = next;
                valid_len = next;
            }
            Err(reason) => {
                if has_complete_line_after(data, next) {
                    return Err(PersistenceError::Corrupted { line: line_no, reason }.into());
                }
                // Undecodable final line: torn tail.
                break;
            }
        }
    }

    Ok(LogScan {
        header: HeaderState::Valid,
        records,
        valid_len: valid_len as u64,
        total_len,
    })
}

/// Read-only full scan of the log at `path`
///
/// A missing file, an empty file or a file without a header all read as an
/// empty log. An incomplete tail is ignored but left in place.
pub fn read_records(path: &Path) -> StoreResult<Vec<Record>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(PersistenceError::io(
                format!("failed to read log {}", path.display()),
                e,
            )
            .into())
        }
    };

    let scan = scan_bytes(&data)?;
    match scan.header {
        HeaderState::Valid => Ok(scan.records),
        _ => Ok(Vec::new()),
    }
}

/// State handed back to the store after recovery
pub(crate) struct RecoveredLog {
    pub file: File,
    pub committed_len: u64,
    pub records: Vec<Record>,
    pub report: RecoveryReport,
}

/// Write a fresh header, replacing whatever is at `path`
fn write_header(path: &Path) -> StoreResult<u64> {
    let line = format!("{}\n", LogHeader::current().to_json_line().map_err(PersistenceError::Encode)?);

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| PersistenceError::io(format!("failed to create log {}", path.display()), e))?;

    file.write_all(line.as_bytes())
        .map_err(|e| PersistenceError::io("failed to write log header", e))?;
    file.sync_all()
        .map_err(|e| PersistenceError::io("fsync failed after writing log header", e))?;

    Ok(line.len() as u64)
}

fn open_for_append(path: &Path) -> StoreResult<File> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| PersistenceError::io(format!("failed to open log {}", path.display()), e).into())
}

/// Bring the log at `path` into a consistent state and materialize it
///
/// Idempotent: running it on an already recovered log changes nothing.
pub(crate) fn recover_log(path: &Path) -> StoreResult<RecoveredLog> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::io(format!("failed to create directory {}", parent.display()), e)
            })?;
        }
    }

    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(PersistenceError::io(
                format!("failed to read log {}", path.display()),
                e,
            )
            .into())
        }
    };

    let scan = scan_bytes(&data)?;
    let mut report = RecoveryReport::default();

    let committed_len = match scan.header {
        HeaderState::Missing | HeaderState::Torn => {
            if scan.header == HeaderState::Torn {
                warn!(path = %path.display(), bytes = scan.total_len, "discarding torn log header");
                report.discarded_bytes = scan.total_len;
            }
            report.header_written = true;
            write_header(path)?
        }
        HeaderState::Unrecognized => {
            let moved = set_aside_unrecognized(path)?;
            warn!(
                path = %path.display(),
                moved_to = %moved.display(),
                "log has no recognized header, moved aside and starting empty"
            );
            report.set_aside = Some(moved);
            report.header_written = true;
            write_header(path)?
        }
        HeaderState::Valid => {
            let trailing = scan.trailing_bytes();
            if trailing > 0 {
                warn!(
                    path = %path.display(),
                    offset = scan.valid_len,
                    bytes = trailing,
                    "truncating incomplete trailing record"
                );
                let file = OpenOptions::new()
                    .write(true)
                    .open(path)
                    .map_err(|e| PersistenceError::io("failed to open log for truncation", e))?;
                file.set_len(scan.valid_len)
                    .map_err(|e| PersistenceError::io("failed to truncate log tail", e))?;
                file.sync_all()
                    .map_err(|e| PersistenceError::io("fsync failed after truncation", e))?;
                report.discarded_bytes = trailing;
            }
            scan.valid_len
        }
    };

    report.records = scan.records.len();
    info!(
        path = %path.display(),
        records = report.records,
        discarded_bytes = report.discarded_bytes,
        "record log recovered"
    );

    Ok(RecoveredLog {
        file: open_for_append(path)?,
        committed_len,
        records: scan.records,
        report,
    })
}

/// Id that the next appended record will receive
pub(crate) fn next_id_after(records: &[Record]) -> RecordId {
    records
        .last()
        .map(|r| r.id.next())
        .unwrap_or(RecordId(1))
}
