use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while re-encoding an object.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad seek mode, malformed configuration or an operation called in the
    /// wrong upload state.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Bytes that are not valid in the configured source encoding.
    #[error("cannot decode {encoding} input at byte {offset}: {reason}")]
    Decode {
        /// Name of the source encoding.
        encoding: String,
        /// Offset in the source object of the malformed sequence.
        offset: u64,
        /// What went wrong.
        reason: String,
    },

    /// Any failure reported by the object store.
    #[error("{operation} failed: {source}")]
    Store {
        /// Store operation, e.g. `UploadPart`.
        operation: &'static str,
        /// Underlying client error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Part bookkeeping does not form a contiguous `1..N` sequence.
    #[error("incomplete upload: {0}")]
    IncompleteUpload(String),

    /// The record was cancelled or ran out of time.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    pub fn store<E>(operation: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Store {
            operation,
            source: source.into(),
        }
    }

    pub fn invalid<T: fmt::Display>(msg: T) -> Self {
        Self::InvalidArgument(msg.to_string())
    }

    /// Only store failures are worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = Error::store("UploadPart", anyhow::anyhow!("HTTP Status Code: 503"));
        assert_eq!(err.to_string(), "UploadPart failed: HTTP Status Code: 503");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_store_error_source() {
        use std::error::Error as _;
        let err = Error::store("HeadObject", "not found");
        assert_eq!(err.source().unwrap().to_string(), "not found");
    }

    #[test]
    fn test_not_retryable() {
        let cases = vec![
            Error::invalid("bad whence"),
            Error::Decode {
                encoding: "Shift_JIS".to_string(),
                offset: 10,
                reason: "malformed".to_string(),
            },
            Error::IncompleteUpload("missing part 2".to_string()),
            Error::Cancelled("timeout".to_string()),
        ];
        for err in cases {
            assert!(!err.is_retryable(), "{err}");
        }
    }

    #[test]
    fn test_decode_display() {
        let err = Error::Decode {
            encoding: "windows-1252".to_string(),
            offset: 5,
            reason: "malformed sequence".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot decode windows-1252 input at byte 5: malformed sequence"
        );
    }
}
