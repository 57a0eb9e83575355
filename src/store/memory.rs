use crate::{
    Error, Result,
    store::{ByteRange, ObjectStore},
    stream::part::CompletedPart,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    HeadObject,
    GetObject,
    CreateMultipartUpload,
    UploadPart,
    CompleteMultipartUpload,
    AbortMultipartUpload,
}

impl Operation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HeadObject => "HeadObject",
            Self::GetObject => "GetObject",
            Self::CreateMultipartUpload => "CreateMultipartUpload",
            Self::UploadPart => "UploadPart",
            Self::CompleteMultipartUpload => "CompleteMultipartUpload",
            Self::AbortMultipartUpload => "AbortMultipartUpload",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Upload {
    bucket: String,
    key: String,
    parts: BTreeMap<u16, (String, Bytes)>,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<(String, String), Bytes>,
    uploads: BTreeMap<String, Upload>,
    next_upload_id: u64,
    calls: BTreeMap<Operation, usize>,
    ranges: Vec<ByteRange>,
    // (operation, part number) -> failures left
    faults: BTreeMap<(Operation, Option<u16>), u32>,
    part_latency: Option<Duration>,
    create_latency: Option<Duration>,
}

impl Inner {
    fn call(&mut self, op: Operation, part: Option<u16>) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;

        for key in [(op, part), (op, None)] {
            if let Some(left) = self.faults.get_mut(&key).filter(|left| **left > 0) {
                *left -= 1;
                return Err(Error::store(op.as_str(), "injected failure"));
            }
        }

        Ok(())
    }
}

/// In-memory object store with multipart semantics close to S3, call
/// accounting and fault injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put_object(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.lock()
            .objects
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Make `op` fail the next `times` calls
    pub fn fail(&self, op: Operation, times: u32) {
        self.lock().faults.insert((op, None), times);
    }

    /// Make `UploadPart` of one part number fail the next `times` calls
    pub fn fail_part(&self, part_number: u16, times: u32) {
        self.lock()
            .faults
            .insert((Operation::UploadPart, Some(part_number)), times);
    }

    /// Slow down every `UploadPart`
    pub fn set_part_latency(&self, latency: Duration) {
        self.lock().part_latency = Some(latency);
    }

    /// Slow down `CreateMultipartUpload`, the upload exists before the delay
    pub fn set_create_latency(&self, latency: Duration) {
        self.lock().create_latency = Some(latency);
    }

    #[must_use]
    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or_default()
    }

    /// Ranges requested through `GetObject`, in order
    #[must_use]
    pub fn requested_ranges(&self) -> Vec<ByteRange> {
        self.lock().ranges.clone()
    }

    /// Multipart uploads neither completed nor aborted
    #[must_use]
    pub fn open_uploads(&self) -> usize {
        self.lock().uploads.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<u64> {
        let mut inner = self.lock();
        inner.call(Operation::HeadObject, None)?;

        inner
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|body| body.len() as u64)
            .ok_or_else(|| Error::store("HeadObject", format!("NoSuchKey: {bucket}/{key}")))
    }

    async fn get_object(&self, bucket: &str, key: &str, range: ByteRange) -> Result<Bytes> {
        let mut inner = self.lock();
        inner.call(Operation::GetObject, None)?;
        inner.ranges.push(range);

        let body = inner
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| Error::store("GetObject", format!("NoSuchKey: {bucket}/{key}")))?;

        let len = body.len() as u64;
        if range.start >= len {
            return Err(Error::store(
                "GetObject",
                format!("InvalidRange: {range} of {len} bytes"),
            ));
        }

        let end = range.end.map_or(len, |end| end.min(len));
        let (start, end) = (usize::try_from(range.start), usize::try_from(end));
        match (start, end) {
            (Ok(start), Ok(end)) if start <= end => Ok(body.slice(start..end)),
            _ => Err(Error::store("GetObject", format!("InvalidRange: {range}"))),
        }
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        let (upload_id, latency) = {
            let mut inner = self.lock();
            inner.call(Operation::CreateMultipartUpload, None)?;

            inner.next_upload_id += 1;
            let upload_id = format!("upload-{}", inner.next_upload_id);
            inner.uploads.insert(
                upload_id.clone(),
                Upload {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    parts: BTreeMap::new(),
                },
            );

            (upload_id, inner.create_latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u16,
        body: Bytes,
    ) -> Result<String> {
        let latency = self.lock().part_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.lock();
        inner.call(Operation::UploadPart, Some(part_number))?;

        let upload = inner
            .uploads
            .get_mut(upload_id)
            .filter(|u| u.bucket == bucket && u.key == key)
            .ok_or_else(|| Error::store("UploadPart", format!("NoSuchUpload: {upload_id}")))?;

        let etag = format!("\"{:x}\"", md5::compute(&body));
        upload.parts.insert(part_number, (etag.clone(), body));

        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<String> {
        let mut inner = self.lock();
        inner.call(Operation::CompleteMultipartUpload, None)?;

        let upload = inner
            .uploads
            .get(upload_id)
            .filter(|u| u.bucket == bucket && u.key == key)
            .ok_or_else(|| {
                Error::store(
                    "CompleteMultipartUpload",
                    format!("NoSuchUpload: {upload_id}"),
                )
            })?;

        if parts.is_empty() {
            return Err(Error::store("CompleteMultipartUpload", "MalformedXML"));
        }

        if parts.windows(2).any(|w| match w {
            [a, b] => a.number() >= b.number(),
            _ => false,
        }) {
            return Err(Error::store("CompleteMultipartUpload", "InvalidPartOrder"));
        }

        let mut body = BytesMut::new();
        for part in parts {
            match upload.parts.get(&part.number()) {
                Some((etag, bytes)) if etag == part.etag() => body.extend_from_slice(bytes),
                _ => {
                    return Err(Error::store(
                        "CompleteMultipartUpload",
                        format!("InvalidPart: {}", part.number()),
                    ));
                }
            }
        }

        let body = body.freeze();
        let etag = format!("\"{:x}-{}\"", md5::compute(&body), parts.len());

        inner.uploads.remove(upload_id);
        inner
            .objects
            .insert((bucket.to_string(), key.to_string()), body);

        Ok(etag)
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.call(Operation::AbortMultipartUpload, None)?;

        match inner.uploads.get(upload_id) {
            Some(u) if u.bucket == bucket && u.key == key => {
                inner.uploads.remove(upload_id);
                Ok(())
            }
            _ => Err(Error::store(
                "AbortMultipartUpload",
                format!("NoSuchUpload: {upload_id}"),
            )),
        }
    }
}
