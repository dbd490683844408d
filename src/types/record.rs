//! Stock movement records
//!
//! A `Record` is one immutable line of the ledger. Callers never build a
//! `Record` directly: they submit a `RecordDraft`, the store validates it,
//! stamps `id`, `timestamp` and `actor`, and returns the persisted value.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display format used for timestamps in free-text search and CSV export
pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identifier of a persisted record (1-based, strictly increasing in append order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> RecordId {
        RecordId(self.0 + 1)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle label of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Received,
    #[serde(rename = "In Transit")]
    InTransit,
    Damaged,
    Delivered,
}

impl Status {
    /// Every allowed status, in form order
    pub const ALL: [Status; 4] = [
        Status::Received,
        Status::InTransit,
        Status::Damaged,
        Status::Delivered,
    ];

    /// Human-readable label (also the persisted form)
    pub fn label(self) -> &'static str {
        match self {
            Status::Received => "Received",
            Status::InTransit => "In Transit",
            Status::Damaged => "Damaged",
            Status::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string is not one of the allowed statuses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for Status {
    type Err = UnknownStatus;

    /// Accepts labels case-insensitively, with spaces, underscores or dashes
    /// ("In Transit", "in_transit", "in-transit", "INTRANSIT").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "received" => Ok(Status::Received),
            "intransit" => Ok(Status::InTransit),
            "damaged" => Ok(Status::Damaged),
            "delivered" => Ok(Status::Delivered),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// An immutable, persisted stock movement
///
/// Field declaration order is the on-disk field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub timestamp: DateTime<Utc>,
    pub item: String,
    pub quantity: u64,
    pub status: Status,
    #[serde(default)]
    pub notes: Option<String>,
    pub actor: String,
}

impl Record {
    /// Timestamp in the `YYYY-MM-DD HH:MM:SS` form shown to users
    pub fn display_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_DISPLAY_FORMAT).to_string()
    }

    /// Display form of every searchable field
    pub fn field_texts(&self) -> [String; 6] {
        [
            self.display_timestamp(),
            self.item.clone(),
            self.quantity.to_string(),
            self.status.label().to_string(),
            self.notes.clone().unwrap_or_default(),
            self.actor.clone(),
        ]
    }

    /// Serialize to one JSONL line (without the trailing newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from one JSONL line
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Unvalidated record as submitted by a caller
///
/// `quantity` is signed and `status` is free text so that invalid form input
/// can be represented and rejected by validation rather than by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub item: String,
    pub quantity: i64,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RecordDraft {
    pub fn new(item: impl Into<String>, quantity: i64, status: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            quantity,
            status: status.into(),
            notes: None,
        }
    }

    /// Attach free-text notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Record {
        Record {
            id: RecordId(7),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            item: "iPhone 15".to_string(),
            quantity: 12,
            status: Status::InTransit,
            notes: Some("pallet, \"fragile\"\nsecond line".to_string()),
            actor: "staff".to_string(),
        }
    }

    #[test]
    fn test_status_parsing_is_lenient() {
        assert_eq!("Received".parse::<Status>().unwrap(), Status::Received);
        assert_eq!("in transit".parse::<Status>().unwrap(), Status::InTransit);
        assert_eq!("IN_TRANSIT".parse::<Status>().unwrap(), Status::InTransit);
        assert_eq!(" delivered ".parse::<Status>().unwrap(), Status::Delivered);
        assert!("Lost".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_serializes_as_label() {
        let json = serde_json::to_string(&Status::InTransit).unwrap();
        assert_eq!(json, "\"In Transit\"");
        let parsed: Status = serde_json::from_str("\"Damaged\"").unwrap();
        assert_eq!(parsed, Status::Damaged);
    }

    #[test]
    fn test_record_json_line_keeps_field_order() {
        let line = sample().to_json_line().unwrap();
        let positions: Vec<usize> = ["\"id\"", "\"timestamp\"", "\"item\"", "\"quantity\"", "\"status\"", "\"notes\"", "\"actor\""]
            .iter()
            .map(|key| line.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_record_json_line_escapes_delimiters() {
        let record = sample();
        let parsed = Record::from_json_line(&record.to_json_line().unwrap()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_field_texts() {
        let texts = sample().field_texts();
        assert_eq!(texts[0], "2024-03-01 09:30:00");
        assert_eq!(texts[2], "12");
        assert_eq!(texts[3], "In Transit");
        assert_eq!(texts[5], "staff");
    }
}
