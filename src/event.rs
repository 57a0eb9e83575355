//! S3 event notifications that trigger a re-encode.

use crate::{Error, Result};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::io::Read;

/// Default first path segment of the target key
pub const DEFAULT_MARKER: &str = "utf-8";

/// `{"Records": [...]}`, every other field is ignored
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub s3: Entity,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub bucket: Bucket,
    pub object: Object,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Object {
    /// URL encoded, as S3 sends it
    pub key: String,
}

impl Event {
    /// One record event, for running against a single object
    #[must_use]
    pub fn single(bucket: &str, key: &str) -> Self {
        Self {
            records: vec![Record::new(bucket, key)],
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if the payload is not a valid event
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::invalid(format!("invalid event: {e}")))
    }

    /// # Errors
    ///
    /// Will return `Err` if the reader fails or the payload is not a valid
    /// event
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| Error::invalid(format!("invalid event: {e}")))
    }
}

impl Record {
    #[must_use]
    pub fn new(bucket: &str, key: &str) -> Self {
        Self {
            s3: Entity {
                bucket: Bucket {
                    name: bucket.to_string(),
                },
                object: Object {
                    key: key.to_string(),
                },
            },
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.s3.bucket.name
    }

    /// The object key with the URL encoding removed
    #[must_use]
    pub fn source_key(&self) -> String {
        decode_key(&self.s3.object.key)
    }
}

/// `unquote_plus`: `+` is a space, then percent decoding. Invalid UTF-8 after
/// decoding is replaced with U+FFFD.
#[must_use]
pub fn decode_key(key: &str) -> String {
    let key = key.replace('+', " ");
    percent_decode_str(&key).decode_utf8_lossy().into_owned()
}

/// Replace the first path segment of `source_key` with `marker`,
/// `latin-1/a/b.txt` becomes `utf-8/a/b.txt` and a key without `/` becomes
/// just the marker.
#[must_use]
pub fn target_key(source_key: &str, marker: &str) -> String {
    match source_key.split_once('/') {
        Some((_, rest)) => format!("{marker}/{rest}"),
        None => marker.to_string(),
    }
}
