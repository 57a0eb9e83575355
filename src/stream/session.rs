//! Lifecycle of one multipart upload.
//!
//! `Created -> Uploading -> {Completed, Aborted}`, calling an operation in the
//! wrong state is an `InvalidArgument` error.

use crate::{Error, Result, store::ObjectStore, stream::part::CompletedPart};
use bytes::Bytes;
use std::{collections::BTreeMap, fmt, time::Duration};
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Created,
    Uploading,
    Completed,
    Aborted,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Created => "created",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(state)
    }
}

/// How many times a part upload is attempted and how long to wait between
/// attempts, the wait doubles every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// Wait before `attempt` (1-based), zero for the first one
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

pub struct UploadSession<'a> {
    store: &'a dyn ObjectStore,
    bucket: String,
    key: String,
    upload_id: Option<String>,
    parts: BTreeMap<u16, CompletedPart>,
    retry: RetryPolicy,
    state: State,
}

impl<'a> UploadSession<'a> {
    #[must_use]
    pub fn new(store: &'a dyn ObjectStore, bucket: &str, key: &str, retry: RetryPolicy) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: None,
            parts: BTreeMap::new(),
            retry,
            state: State::Created,
        }
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Parts acknowledged so far, ascending
    pub fn parts(&self) -> impl Iterator<Item = &CompletedPart> {
        self.parts.values()
    }

    fn expect_state(&self, expected: State, operation: &str) -> Result<&str> {
        match (&self.upload_id, self.state) {
            (Some(upload_id), state) if state == expected => Ok(upload_id),
            (None, State::Created) if expected == State::Created => Ok(""),
            _ => Err(Error::invalid(format!(
                "cannot {operation} {}/{}: upload is {}",
                self.bucket, self.key, self.state
            ))),
        }
    }

    /// Start the multipart upload and return its id
    ///
    /// # Errors
    ///
    /// Will return `Err` if the session was already created or the store
    /// rejects the request
    pub async fn create(&mut self) -> Result<&str> {
        self.expect_state(State::Created, "create")?;

        let upload_id = self
            .store
            .create_multipart_upload(&self.bucket, &self.key)
            .await?;

        log::info!(
            "created multipart upload for {}/{}, upload id: {upload_id}",
            self.bucket,
            self.key
        );

        self.state = State::Uploading;

        Ok(self.upload_id.insert(upload_id).as_str())
    }

    /// Upload one part, store errors are retried with exponential backoff
    ///
    /// # Errors
    ///
    /// Will return `Err` if the session is not uploading, the part number is
    /// out of range or every attempt failed
    pub async fn upload_part(&mut self, number: u16, body: Bytes) -> Result<CompletedPart> {
        let upload_id = self.expect_state(State::Uploading, "upload part to")?.to_string();

        if number == 0 {
            return Err(Error::invalid("part numbers start at 1"));
        }

        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;

        let etag = loop {
            let backoff = self.retry.backoff(attempt);
            if !backoff.is_zero() {
                log::warn!(
                    "retrying part number {number} of {}/{} in {backoff:?}",
                    self.bucket,
                    self.key
                );
                sleep(backoff).await;
            }

            match self
                .store
                .upload_part(&self.bucket, &self.key, &upload_id, number, body.clone())
                .await
            {
                Ok(etag) => break etag,

                Err(e) if e.is_retryable() && attempt < attempts => {
                    log::error!(
                        "Error uploading part number {number}, attempt {attempt}/{attempts} failed: {e}"
                    );
                    attempt += 1;
                }

                Err(e) => {
                    log::error!(
                        "Error uploading part number {number}, attempt {attempt}/{attempts} failed: {e}"
                    );
                    return Err(e);
                }
            }
        };

        log::info!("Uploaded part: {number}, etag: {etag}");

        let part = CompletedPart::new(number, etag);
        self.parts.insert(number, part.clone());

        Ok(part)
    }

    /// Complete the upload with every recorded part, returns the `ETag` of
    /// the new object
    ///
    /// # Errors
    ///
    /// Will return `Err` if no part was uploaded, the part numbers are not
    /// exactly `1..N` or the store rejects the request
    pub async fn complete(&mut self) -> Result<String> {
        let upload_id = self.expect_state(State::Uploading, "complete")?.to_string();

        if self.parts.is_empty() {
            return Err(Error::IncompleteUpload(format!(
                "no parts uploaded for {}/{}",
                self.bucket, self.key
            )));
        }

        // BTreeMap keys are unique and sorted, so 1..N means the last is N
        let expected = 1..;
        if let Some((got, want)) = self
            .parts
            .keys()
            .zip(expected)
            .find(|(got, want)| **got != *want)
        {
            return Err(Error::IncompleteUpload(format!(
                "part {want} is missing, found part {got} instead"
            )));
        }

        let parts: Vec<CompletedPart> = self.parts.values().cloned().collect();

        let etag = self
            .store
            .complete_multipart_upload(&self.bucket, &self.key, &upload_id, &parts)
            .await?;

        log::info!(
            "completed {}/{} with {} parts, etag: {etag}",
            self.bucket,
            self.key,
            parts.len()
        );

        self.state = State::Completed;

        Ok(etag)
    }

    /// Abort the upload, the session is `Aborted` even when the store call
    /// fails so an upload is never aborted twice
    ///
    /// # Errors
    ///
    /// Will return `Err` if the session is not uploading or the store rejects
    /// the request
    pub async fn abort(&mut self) -> Result<()> {
        let upload_id = self.expect_state(State::Uploading, "abort")?.to_string();

        self.state = State::Aborted;

        log::warn!(
            "aborting multipart upload of {}/{}, upload id: {upload_id}",
            self.bucket,
            self.key
        );

        self.store
            .abort_multipart_upload(&self.bucket, &self.key, &upload_id)
            .await
    }
}

impl fmt::Debug for UploadSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("upload_id", &self.upload_id)
            .field("parts", &self.parts.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
