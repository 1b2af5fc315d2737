//! Inbound bucket notification payloads.

use awsutils_common::error::{AwsUtilsError, Result};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3EventMessage {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: String,
    #[serde(rename = "awsRegion", default)]
    pub aws_region: Option<String>,
    pub s3: S3EventEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3EventEntity {
    pub bucket: EventBucket,
    pub object: EventObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventObject {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "eTag", default)]
    pub etag: Option<String>,
}

/// The object an event points at, with its key already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTarget {
    pub event_name: String,
    pub bucket: String,
    pub key: String,
}

impl S3EventMessage {
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|err| AwsUtilsError::InvalidArgument(format!("invalid event payload: {err}")))
    }

    /// Only the first record is considered.
    pub fn target(&self) -> Result<EventTarget> {
        let record = self.records.first().ok_or_else(|| {
            AwsUtilsError::InvalidArgument("event payload has no records".to_string())
        })?;

        let key = decode_event_key(&record.s3.object.key);
        if key.is_empty() {
            return Err(AwsUtilsError::InvalidArgument(
                "event record has an empty object key".to_string(),
            ));
        }
        if record.s3.bucket.name.is_empty() {
            return Err(AwsUtilsError::InvalidArgument(
                "event record has an empty bucket name".to_string(),
            ));
        }

        Ok(EventTarget {
            event_name: record.event_name.clone(),
            bucket: record.s3.bucket.name.clone(),
            key,
        })
    }
}

/// Keys arrive form-encoded: `+` for space, `%XX` for everything else.
pub fn decode_event_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
