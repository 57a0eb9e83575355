use crate::s3::{
    S3,
    actions::{Action, key_path, response_error},
    request, tools,
};
use anyhow::{Result, anyhow};
use http::Method;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct AbortMultipartUpload<'a> {
    key: &'a str,
    upload_id: &'a str,
}

impl<'a> AbortMultipartUpload<'a> {
    #[must_use]
    pub const fn new(key: &'a str, upload_id: &'a str) -> Self {
        Self { key, upload_id }
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(&self, s3: &S3) -> Result<()> {
        let (url, headers) = &self.sign(s3, &tools::sha256_hex(""), None, None)?;
        let response =
            request::request(s3.client(), url.clone(), self.http_method(), headers, None).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!(response_error(response).await?))
        }
    }
}

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_AbortMultipartUpload.html>
impl Action for AbortMultipartUpload<'_> {
    fn http_method(&self) -> Method {
        Method::DELETE
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();

        // uploadId - Upload ID that identifies the multipart upload.
        map.insert("uploadId", self.upload_id);

        Some(map)
    }

    fn path(&self) -> Option<Vec<&str>> {
        Some(key_path(self.key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::s3::actions::tests::s3;
    use mockito::Matcher;

    #[test]
    fn test_method() {
        let action = AbortMultipartUpload::new("key", "uid");
        assert_eq!(Method::DELETE, action.http_method());
    }

    #[tokio::test]
    async fn test_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/bucket/utf-8/file.txt")
            .match_query(Matcher::UrlEncoded("uploadId".into(), "upload-123".into()))
            .with_status(204)
            .create_async()
            .await;

        AbortMultipartUpload::new("utf-8/file.txt", "upload-123")
            .request(&s3(&server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_no_such_upload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/bucket/key")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("<Error><Code>NoSuchUpload</Code><Message>The specified upload does not exist.</Message></Error>")
            .create_async()
            .await;

        let err = AbortMultipartUpload::new("key", "uid")
            .request(&s3(&server.url()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("NoSuchUpload"));
    }
}
