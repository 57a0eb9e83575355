use crate::{
    Error, Result,
    s3::{S3, actions},
    store::{ByteRange, ObjectStore},
    stream::part::CompletedPart,
};
use async_trait::async_trait;
use bytes::Bytes;

// the re-encoded objects are always UTF-8 text
const TARGET_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[async_trait]
impl ObjectStore for S3 {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<u64> {
        actions::HeadObject::new(key)
            .request(&self.with_bucket(bucket))
            .await
            .map_err(|e| Error::store("HeadObject", e))
    }

    async fn get_object(&self, bucket: &str, key: &str, range: ByteRange) -> Result<Bytes> {
        let last = match range.end {
            Some(end) if end <= range.start => return Ok(Bytes::new()),
            Some(end) => Some(end - 1),
            None => None,
        };

        actions::GetObject::new(key)
            .with_range(range.start, last)
            .request(&self.with_bucket(bucket))
            .await
            .map_err(|e| Error::store("GetObject", e))
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        actions::CreateMultipartUpload::new(key, Some(TARGET_CONTENT_TYPE))
            .request(&self.with_bucket(bucket))
            .await
            .map(|rs| rs.upload_id)
            .map_err(|e| Error::store("CreateMultipartUpload", e))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u16,
        body: Bytes,
    ) -> Result<String> {
        actions::UploadPart::new(key, upload_id, part_number, body)
            .request(&self.with_bucket(bucket))
            .await
            .map_err(|e| Error::store("UploadPart", e))
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<String> {
        actions::CompleteMultipartUpload::new(key, upload_id, parts)
            .request(&self.with_bucket(bucket))
            .await
            .map(|rs| rs.e_tag)
            .map_err(|e| Error::store("CompleteMultipartUpload", e))
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        actions::AbortMultipartUpload::new(key, upload_id)
            .request(&self.with_bucket(bucket))
            .await
            .map_err(|e| Error::store("AbortMultipartUpload", e))
    }
}
