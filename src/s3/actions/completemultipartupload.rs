//! Amazon S3 multipart upload limits
//! Maximum object size 5 TB
//! Maximum number of parts per upload  10,000
//! <https://docs.aws.amazon.com/AmazonS3/latest/dev/qfacts.html>

use crate::{
    s3::{
        S3,
        actions::{Action, key_path, response_error},
        request,
        responses::{
            CompleteMultipartUploadRequest, CompleteMultipartUploadResult, ErrorResponse,
            PartRequest,
        },
        tools,
    },
    stream::part::CompletedPart,
};
use anyhow::{Result, anyhow};
use bytes::Bytes;
use http::Method;
use quick_xml::{de::from_str, se::to_string};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct CompleteMultipartUpload<'a> {
    key: &'a str,
    upload_id: &'a str,
    parts: &'a [CompletedPart],
}

impl<'a> CompleteMultipartUpload<'a> {
    #[must_use]
    pub const fn new(key: &'a str, upload_id: &'a str, parts: &'a [CompletedPart]) -> Self {
        Self {
            key,
            upload_id,
            parts,
        }
    }

    /// XML body listing the parts in the given order
    ///
    /// # Errors
    ///
    /// Will return `Err` if the body can not be serialized
    pub fn body(&self) -> Result<String> {
        let request = CompleteMultipartUploadRequest {
            parts: self
                .parts
                .iter()
                .map(|part| PartRequest {
                    etag: part.etag(),
                    number: part.number(),
                })
                .collect(),
        };

        Ok(to_string(&request)?)
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(&self, s3: &S3) -> Result<CompleteMultipartUploadResult> {
        let body = self.body()?;
        let sha256 = tools::sha256_hex(&body);

        let (url, headers) = &self.sign(s3, &sha256, None, Some(body.len()))?;
        let response = request::request(
            s3.client(),
            url.clone(),
            self.http_method(),
            headers,
            Some(Bytes::from(body)),
        )
        .await?;

        if response.status().is_success() {
            let text = response.text().await?;

            // a 200 OK may still carry an <Error> once the request was accepted
            if let Ok(e) = from_str::<ErrorResponse>(&text) {
                return Err(anyhow!("Code: {}, Message: {}", e.code, e.message));
            }

            Ok(from_str(&text)?)
        } else {
            Err(anyhow!(response_error(response).await?))
        }
    }
}

impl Action for CompleteMultipartUpload<'_> {
    fn http_method(&self) -> Method {
        Method::POST
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("uploadId", self.upload_id);
        Some(map)
    }

    fn path(&self) -> Option<Vec<&str>> {
        Some(key_path(self.key))
    }
}
