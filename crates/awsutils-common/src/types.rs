use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of a stored object as reported by a listing or head call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub storage_class: String,
    pub last_modified: DateTime<Utc>,
}

/// Inclusive byte range, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for `Range` and `x-amz-copy-source-range` headers.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

pub fn strip_etag_quotes(etag: &str) -> String {
    etag.trim().trim_matches('"').to_string()
}
