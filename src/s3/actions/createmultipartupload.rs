//! Amazon S3 multipart upload limits
//! Maximum object size 5 TB
//! Maximum number of parts per upload  10,000
//! <https://docs.aws.amazon.com/AmazonS3/latest/dev/qfacts.html>

use crate::s3::{
    S3,
    actions::{Action, key_path, response_error},
    request,
    responses::InitiateMultipartUploadResult,
    tools,
};
use anyhow::{Result, anyhow};
use http::Method;
use quick_xml::de::from_str;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct CreateMultipartUpload<'a> {
    key: &'a str,
    content_type: Option<&'a str>,
}

impl<'a> CreateMultipartUpload<'a> {
    #[must_use]
    pub const fn new(key: &'a str, content_type: Option<&'a str>) -> Self {
        Self { key, content_type }
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(&self, s3: &S3) -> Result<InitiateMultipartUploadResult> {
        let (url, headers) = &self.sign(s3, &tools::sha256_hex(""), None, None)?;
        let response =
            request::request(s3.client(), url.clone(), self.http_method(), headers, None).await?;

        if response.status().is_success() {
            let upload_req: InitiateMultipartUploadResult = from_str(&response.text().await?)?;
            Ok(upload_req)
        } else {
            Err(anyhow!(response_error(response).await?))
        }
    }
}

impl Action for CreateMultipartUpload<'_> {
    fn http_method(&self) -> Method {
        Method::POST
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        let content_type = self.content_type?;
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("content-type", content_type);
        Some(map)
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();

        // uploads
        map.insert("uploads", "");

        Some(map)
    }

    fn path(&self) -> Option<Vec<&str>> {
        Some(key_path(self.key))
    }
}
