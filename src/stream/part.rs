/// Half open byte range `[start, end)` of the source object mapped to one
/// upload part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    number: u16,
    start: u64,
    end: u64,
}

impl Chunk {
    #[must_use]
    pub const fn new(number: u16, start: u64, end: u64) -> Self {
        Self { number, start, end }
    }

    #[must_use]
    pub const fn number(&self) -> u16 {
        self.number
    }

    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> u64 {
        self.end
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A part the store acknowledged, needed to complete the upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    number: u16,
    etag: String,
}

impl CompletedPart {
    #[must_use]
    pub const fn new(number: u16, etag: String) -> Self {
        Self { number, etag }
    }

    #[must_use]
    pub const fn number(&self) -> u16 {
        self.number
    }

    #[must_use]
    pub fn etag(&self) -> &str {
        &self.etag
    }
}
