//! Multipart upload limits
//!
//! - [S3 Quotas](https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html)
//! - [Multipart Upload Overview](https://docs.aws.amazon.com/AmazonS3/latest/userguide/mpuoverview.html)

/// Maximum size of a single part, 5 GiB
pub const MAX_PART_SIZE_BYTES: u64 = 5_368_709_120;

/// Parts are numbered 1 to 10,000
pub const MAX_PARTS_PER_UPLOAD: u64 = 10_000;

/// Minimum size of every part but the last one, 5 MiB
pub const MIN_PART_SIZE_BYTES: u64 = 5_242_880;

/// Source bytes read per part, 50 MiB
///
/// Decoding may shrink a chunk (UTF-16 to ASCII halves it), the default keeps
/// every part above `MIN_PART_SIZE_BYTES` for encodings of up to 4 bytes per
/// character.
pub const DEFAULT_CHUNK_SIZE: u64 = 52_428_800;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_sane() {
        const _: () = assert!(MAX_PART_SIZE_BYTES > DEFAULT_CHUNK_SIZE);
        const _: () = assert!(DEFAULT_CHUNK_SIZE / 4 >= MIN_PART_SIZE_BYTES);
    }

    #[test]
    fn test_part_number_type_sufficient() {
        assert!(u16::try_from(MAX_PARTS_PER_UPLOAD).is_ok());
    }

    #[test]
    fn test_default_chunk_size() {
        assert_eq!(DEFAULT_CHUNK_SIZE, 50 * 1024 * 1024);
    }
}
