//! Re-encode text objects stored in S3 to UTF-8.
//!
//! The source object is read with ranged `GetObject` requests, decoded chunk
//! by chunk and written back through a multipart upload, so the full object is
//! never held in memory.

pub mod cli;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod s3;
pub mod store;
pub mod stream;
pub mod transcode;

pub use self::error::{Error, Result};
