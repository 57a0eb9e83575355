//! Seekable read-only stream over a remote object.
//!
//! Every `read` is one ranged `GetObject`, nothing is cached or read ahead.

use crate::{
    Error, Result,
    store::{ByteRange, ObjectStore},
};
use bytes::Bytes;
use std::{fmt, io::SeekFrom};

/// Reference point of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    FromStart,
    FromCurrent,
    FromEnd,
}

/// `SEEK_SET`, `SEEK_CUR` and `SEEK_END`
impl TryFrom<i32> for Whence {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::FromStart),
            1 => Ok(Self::FromCurrent),
            2 => Ok(Self::FromEnd),
            _ => Err(Error::invalid(format!(
                "invalid whence ({value}, should be 0, 1 or 2)"
            ))),
        }
    }
}

/// Identity and declared size of the source object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub bucket: String,
    pub key: String,
    pub size: u64,
}

impl RemoteObject {
    /// Fetch the size once with `HeadObject`
    ///
    /// # Errors
    ///
    /// Will return `Err` if the object can not be found
    pub async fn head(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<Self> {
        let size = store.head_object(bucket, key).await?;

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
        })
    }
}

pub struct RangeReader<'a> {
    store: &'a dyn ObjectStore,
    object: &'a RemoteObject,
    position: u64,
}

impl<'a> RangeReader<'a> {
    #[must_use]
    pub fn new(store: &'a dyn ObjectStore, object: &'a RemoteObject) -> Self {
        Self {
            store,
            object,
            position: 0,
        }
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.object.size
    }

    #[must_use]
    pub const fn tell(&self) -> u64 {
        self.position
    }

    /// Move the cursor and return the new position. Positions past the end
    /// are allowed, reads there return nothing.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the new position would be negative
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::FromStart => 0,
            Whence::FromCurrent => self.position,
            Whence::FromEnd => self.object.size,
        };

        let position = base.checked_add_signed(offset).ok_or_else(|| {
            Error::invalid(format!(
                "invalid seek to a negative position ({base} + {offset})"
            ))
        })?;

        self.position = position;

        Ok(self.position)
    }

    /// `std::io::SeekFrom` flavour of [`RangeReader::seek`]
    ///
    /// # Errors
    ///
    /// Will return `Err` if the new position would be negative or does not
    /// fit in an `i64`
    pub fn seek_from(&mut self, pos: SeekFrom) -> Result<u64> {
        match pos {
            SeekFrom::Start(n) => {
                let offset = i64::try_from(n)
                    .map_err(|_| Error::invalid(format!("seek offset too large: {n}")))?;
                self.seek(offset, Whence::FromStart)
            }
            SeekFrom::Current(n) => self.seek(n, Whence::FromCurrent),
            SeekFrom::End(n) => self.seek(n, Whence::FromEnd),
        }
    }

    /// Read `n` bytes, or to the end of the object when `n` is `None` or
    /// would reach past it. Nothing is requested for `Some(0)`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the ranged read fails or returns fewer bytes than
    /// requested
    pub async fn read(&mut self, n: Option<u64>) -> Result<Bytes> {
        let size = self.object.size;

        if self.position >= size || n == Some(0) {
            return Ok(Bytes::new());
        }

        let range = match n {
            Some(n) if self.position.saturating_add(n) < size => {
                ByteRange::new(self.position, self.position + n)
            }
            _ => ByteRange::to_end(self.position),
        };

        log::debug!(
            "read {} of {}/{} ({size} bytes)",
            range,
            self.object.bucket,
            self.object.key
        );

        let bytes = self
            .store
            .get_object(&self.object.bucket, &self.object.key, range)
            .await?;

        let expected = range.end.unwrap_or(size) - range.start;
        if bytes.len() as u64 != expected {
            return Err(Error::store(
                "GetObject",
                format!(
                    "short read at {}: expected {expected} bytes, got {}",
                    range.start,
                    bytes.len()
                ),
            ));
        }

        self.position = range.end.unwrap_or(size);

        Ok(bytes)
    }
}

impl fmt::Debug for RangeReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeReader")
            .field("object", self.object)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}
