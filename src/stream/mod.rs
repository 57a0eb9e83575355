//! Streaming side of the pipeline: ranged reads of the source object, the
//! chunk plan and the multipart upload of the target.

pub mod iterator;
pub mod part;
pub mod reader;
pub mod session;

pub use self::{
    iterator::{ChunkIterator, plan},
    part::{Chunk, CompletedPart},
    reader::{RangeReader, RemoteObject, Whence},
    session::{RetryPolicy, State, UploadSession},
};
