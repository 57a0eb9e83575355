//! Re-encode the objects named by an event, one multipart upload per record.

use crate::{
    Error, Result,
    event::{DEFAULT_MARKER, Event, Record, target_key},
    s3::limits::DEFAULT_CHUNK_SIZE,
    store::ObjectStore,
    stream::{ChunkIterator, RangeReader, RemoteObject, RetryPolicy, State, UploadSession},
    transcode::{SourceEncoding, Transcoder},
};
use futures::stream::{self, StreamExt};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Config {
    pub encoding: SourceEncoding,
    pub chunk_size: u64,
    pub marker: String,
    pub retry: RetryPolicy,
    /// Per record, covers everything up to completing the upload
    pub timeout: Option<Duration>,
    /// Records processed at the same time
    pub max_requests: usize,
}

impl Config {
    #[must_use]
    pub fn new(encoding: SourceEncoding) -> Self {
        Self {
            encoding,
            chunk_size: DEFAULT_CHUNK_SIZE,
            marker: DEFAULT_MARKER.to_string(),
            retry: RetryPolicy::default(),
            timeout: None,
            max_requests: 1,
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if a value can not work
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::invalid("chunk size must be greater than 0"));
        }

        if self.marker.is_empty() || self.marker.contains('/') {
            return Err(Error::invalid(format!(
                "marker must be a single non-empty path segment: {:?}",
                self.marker
            )));
        }

        if self.max_requests == 0 {
            return Err(Error::invalid("max requests must be greater than 0"));
        }

        Ok(())
    }
}

/// What was written for a successful record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub source_size: u64,
    pub bytes_written: u64,
    pub parts: u16,
    pub etag: String,
}

#[derive(Debug)]
pub struct RecordOutcome {
    pub bucket: String,
    pub source_key: String,
    pub target_key: String,
    pub result: Result<Summary>,
    /// Set when the cleanup of a failed record failed too
    pub abort_error: Option<Error>,
}

impl RecordOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct Recoder {
    store: Arc<dyn ObjectStore>,
    config: Config,
    cancel: CancellationToken,
}

impl Recoder {
    /// # Errors
    ///
    /// Will return `Err` if the configuration is invalid
    pub fn new(store: Arc<dyn ObjectStore>, config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an external token, cancelling it aborts the open uploads
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process every record, a failed record does not stop the others. The
    /// outcomes are in the same order as the records.
    pub async fn process_batch(&self, event: &Event) -> Vec<RecordOutcome> {
        stream::iter(&event.records)
            .map(|record| self.process_record(record))
            .buffered(self.config.max_requests.max(1))
            .collect()
            .await
    }

    pub async fn process_record(&self, record: &Record) -> RecordOutcome {
        let bucket = record.bucket().to_string();
        let source_key = record.source_key();
        let target_key = target_key(&source_key, &self.config.marker);

        log::info!("Processing file {bucket}/{source_key} -> {target_key}");

        let (result, abort_error) = if source_key == target_key {
            let e = Error::invalid(format!(
                "{source_key} is already under the {} marker",
                self.config.marker
            ));
            (Err(e), None)
        } else {
            let deadline = self.config.timeout.map(|timeout| Instant::now() + timeout);
            self.recode(&bucket, &source_key, &target_key, deadline)
                .await
        };

        match &result {
            Ok(summary) => log::info!(
                "{bucket}/{source_key} re-encoded to {target_key}: {} bytes in {} parts",
                summary.bytes_written,
                summary.parts
            ),
            Err(e) => log::error!("{bucket}/{source_key} failed: {e}"),
        }

        RecordOutcome {
            bucket,
            source_key,
            target_key,
            result,
            abort_error,
        }
    }

    async fn recode(
        &self,
        bucket: &str,
        source_key: &str,
        target_key: &str,
        deadline: Option<Instant>,
    ) -> (Result<Summary>, Option<Error>) {
        let store = self.store.as_ref();

        let prepared = self
            .guard(deadline, async {
                let object = RemoteObject::head(store, bucket, source_key).await?;
                let chunks = ChunkIterator::new(object.size, self.config.chunk_size)?;
                Ok::<_, Error>((object, chunks))
            })
            .await;

        let (object, chunks) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return (Err(e), None),
        };

        let mut session = UploadSession::new(store, bucket, target_key, self.config.retry);

        // create runs to the end, dropping it mid-flight could leave an
        // upload behind that has no id to abort
        let result = match session.create().await.map(|_| ()) {
            Ok(()) => {
                self.guard(deadline, self.transfer(&object, chunks, &mut session))
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(summary) => (Ok(summary), None),

            // nothing to clean up when the upload never started
            Err(e) if session.state() != State::Uploading => (Err(e), None),

            Err(e) => match session.abort().await {
                Ok(()) => (Err(e), None),
                Err(abort_error) => {
                    log::error!(
                        "could not abort upload {} of {bucket}/{target_key}: {abort_error}",
                        session.upload_id().unwrap_or_default()
                    );
                    (Err(e), Some(abort_error))
                }
            },
        }
    }

    async fn transfer(
        &self,
        object: &RemoteObject,
        chunks: ChunkIterator,
        session: &mut UploadSession<'_>,
    ) -> Result<Summary> {
        let mut reader = RangeReader::new(self.store.as_ref(), object);
        let mut transcoder = Transcoder::new(self.config.encoding);
        let mut bytes_written = 0;
        let mut parts = 0;

        for chunk in chunks {
            let bytes = reader.read(Some(chunk.len())).await?;
            let body = transcoder.transcode(&bytes, chunk.end() >= object.size)?;

            log::debug!(
                "part {}: {} source bytes [{}, {}) -> {} bytes",
                chunk.number(),
                bytes.len(),
                chunk.start(),
                chunk.end(),
                body.len()
            );

            bytes_written += body.len() as u64;
            session.upload_part(chunk.number(), body).await?;
            parts = chunk.number();
        }

        let etag = session.complete().await?;

        Ok(Summary {
            source_size: object.size,
            bytes_written,
            parts,
            etag,
        })
    }

    fn interrupted(&self, deadline: Option<Instant>) -> Option<Error> {
        if self.cancel.is_cancelled() {
            Some(Error::Cancelled("cancellation requested".to_string()))
        } else if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            Some(Error::Cancelled("timed out".to_string()))
        } else {
            None
        }
    }

    // stop `fut` on cancellation or when the deadline passes, `fut` is not
    // polled at all once either already happened
    async fn guard<T>(
        &self,
        deadline: Option<Instant>,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        if let Some(e) = self.interrupted(deadline) {
            return Err(e);
        }

        let timed = async {
            match deadline {
                Some(deadline) => timeout_at(deadline, fut)
                    .await
                    .map_err(|_| Error::Cancelled("timed out".to_string()))?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled("cancellation requested".to_string())),
            result = timed => result,
        }
    }
}
