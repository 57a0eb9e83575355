//! Object store operations the pipeline consumes.
//!
//! [`S3`] talks to S3 or any S3 compatible service, [`MemoryStore`] keeps
//! objects in memory and is used by the tests.

mod memory;
mod s3;

pub use self::memory::{MemoryStore, Operation};

use crate::{Result, stream::part::CompletedPart};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// Byte range of a ranged `GetObject`, `end` is exclusive and `None` reads to
/// the end of the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    #[must_use]
    pub const fn to_end(start: u64) -> Self {
        Self { start, end: None }
    }
}

// HTTP Range header, the last byte position is inclusive
impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "bytes={}-{}", self.start, end.saturating_sub(1)),
            None => write!(f, "bytes={}-", self.start),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Declared size of the object in bytes
    async fn head_object(&self, bucket: &str, key: &str) -> Result<u64>;

    /// Ranged read, `range.start` must be within the object
    async fn get_object(&self, bucket: &str, key: &str, range: ByteRange) -> Result<Bytes>;

    /// Returns the upload id
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String>;

    /// Returns the `ETag` of the part
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u16,
        body: Bytes,
    ) -> Result<String>;

    /// Returns the `ETag` of the new object
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<String>;

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;
}
