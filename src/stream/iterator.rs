use crate::{
    Error, Result,
    s3::limits::MAX_PARTS_PER_UPLOAD,
    stream::part::Chunk,
};
use std::{cmp::min, iter::Iterator};

/// Splits `[0, size)` into chunks of `chunk_size` bytes, the last one may be
/// shorter. An empty object still yields one empty chunk so the upload has a
/// part to complete with.
#[derive(Debug, Clone)]
pub struct ChunkIterator {
    seek: u64,
    chunk_size: u64,
    size: u64,
    number: u16,
    done: bool,
}

impl ChunkIterator {
    /// # Errors
    ///
    /// Will return `Err` if `chunk_size` is zero or the object would need more
    /// parts than a multipart upload allows
    pub fn new(size: u64, chunk_size: u64) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::invalid("chunk size must be greater than 0"));
        }

        let parts = part_count(size, chunk_size);
        if parts > MAX_PARTS_PER_UPLOAD {
            return Err(Error::invalid(format!(
                "{size} bytes in chunks of {chunk_size} needs {parts} parts, the maximum is {MAX_PARTS_PER_UPLOAD}"
            )));
        }

        Ok(Self {
            seek: 0,
            chunk_size,
            size,
            number: 1,
            done: false,
        })
    }
}

impl Iterator for ChunkIterator {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let chunk = min(self.chunk_size, self.size - self.seek);
        let item = Chunk::new(self.number, self.seek, self.seek + chunk);

        log::debug!(
            "ChunkIterator::next() -> number: {}, start: {}, end: {}",
            item.number(),
            item.start(),
            item.end()
        );

        self.seek += chunk;
        self.number = self.number.saturating_add(1);
        self.done = self.seek >= self.size;

        Some(item)
    }
}

/// `size / chunk_size` full chunks plus one for the remainder, at least one
#[must_use]
pub const fn part_count(size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }

    let full = size / chunk_size;
    let parts = if size % chunk_size > 0 { full + 1 } else { full };

    if parts == 0 { 1 } else { parts }
}

/// Collected plan, see [`ChunkIterator`]
///
/// # Errors
///
/// Will return `Err` if `chunk_size` is zero or too many parts are needed
pub fn plan(size: u64, chunk_size: u64) -> Result<Vec<Chunk>> {
    Ok(ChunkIterator::new(size, chunk_size)?.collect())
}
