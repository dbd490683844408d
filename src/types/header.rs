//! Log header - first line of the record log

use serde::{Deserialize, Serialize};

/// Marker stored in the header's `type` field
pub const LOG_HEADER_TYPE: &str = "stock_log";

/// Current on-disk format version
pub const LOG_FORMAT_VERSION: u32 = 1;

/// Field order of every record line
pub const RECORD_FIELDS: [&str; 7] = [
    "id",
    "timestamp",
    "item",
    "quantity",
    "status",
    "notes",
    "actor",
];

/// Header line naming the record schema, written once before the first record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogHeader {
    /// Always "stock_log"
    #[serde(rename = "type")]
    pub header_type: String,

    /// Version of the record format (for future record variants)
    pub version: u32,

    /// Field order of each record line
    pub fields: Vec<String>,
}

impl LogHeader {
    /// Header for the current format
    pub fn current() -> Self {
        Self {
            header_type: LOG_HEADER_TYPE.to_string(),
            version: LOG_FORMAT_VERSION,
            fields: RECORD_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Whether this header describes a log this build can read
    pub fn is_supported(&self) -> bool {
        self.header_type == LOG_HEADER_TYPE && self.version == LOG_FORMAT_VERSION
    }

    /// Parse from the first line of the log
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Serialize to a JSON line (without the trailing newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
