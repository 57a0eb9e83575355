use crate::s3::{
    S3,
    actions::{Action, key_path, response_error},
    request, tools,
};
use anyhow::{Result, anyhow};
use bytes::Bytes;
use http::Method;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct UploadPart<'a> {
    key: &'a str,
    upload_id: &'a str,
    part_number: String,
    body: Bytes,
}

impl<'a> UploadPart<'a> {
    #[must_use]
    pub fn new(key: &'a str, upload_id: &'a str, part_number: u16, body: Bytes) -> Self {
        Self {
            key,
            upload_id,
            part_number: part_number.to_string(),
            body,
        }
    }

    /// Returns the `ETag` of the part
    ///
    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(&self, s3: &S3) -> Result<String> {
        let sha256 = tools::sha256_hex(&self.body);
        let md5 = tools::base64_md5(&self.body);

        let (url, headers) = &self.sign(s3, &sha256, Some(&md5), Some(self.body.len()))?;
        let response = request::request(
            s3.client(),
            url.clone(),
            self.http_method(),
            headers,
            Some(self.body.clone()),
        )
        .await?;

        if response.status().is_success() {
            match response.headers().get("ETag") {
                Some(etag) => Ok(etag.to_str()?.to_string()),
                None => Err(anyhow!("missing ETag")),
            }
        } else {
            Err(anyhow!(response_error(response).await?))
        }
    }
}

impl Action for UploadPart<'_> {
    fn http_method(&self) -> Method {
        Method::PUT
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("partNumber", &self.part_number);
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
        let action = UploadPart::new("key", "uid", 1, Bytes::new());
        assert_eq!(Method::PUT, action.http_method());
    }

    #[test]
    fn test_query_pairs() {
        let action = UploadPart::new("key", "uid", 7, Bytes::new());
        let mut map = BTreeMap::new();
        map.insert("partNumber", "7");
        map.insert("uploadId", "uid");
        assert_eq!(Some(map), action.query_pairs());
    }

    #[test]
    fn test_sign_content_headers() {
        let s3 = s3("https://s3.example.com");
        let body = Bytes::from_static(b"hello world");
        let action = UploadPart::new("key", "uid", 1, body.clone());
        let (url, headers) = action
            .sign(
                &s3,
                &tools::sha256_hex(&body),
                Some(&tools::base64_md5(&body)),
                Some(body.len()),
            )
            .unwrap();
        assert_eq!(
            "https://s3.example.com/bucket/key?partNumber=1&uploadId=uid",
            url.as_str()
        );
        assert_eq!(headers.get("content-md5").unwrap(), "XrY7u+Ae7tCTyyK7j1rNww==");
        assert_eq!(headers.get("content-length").unwrap(), "11");
    }

    #[tokio::test]
    async fn test_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/bucket/utf-8/file.txt")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("partNumber".into(), "2".into()),
                Matcher::UrlEncoded("uploadId".into(), "upload-123".into()),
            ]))
            .match_header("content-md5", "XrY7u+Ae7tCTyyK7j1rNww==")
            .match_body("hello world")
            .with_status(200)
            .with_header("ETag", "\"5eb63bbbe01eeed093cb22bb8f5acdc3\"")
            .create_async()
            .await;

        let etag = UploadPart::new(
            "utf-8/file.txt",
            "upload-123",
            2,
            Bytes::from_static(b"hello world"),
        )
        .request(&s3(&server.url()))
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(etag, "\"5eb63bbbe01eeed093cb22bb8f5acdc3\"");
    }

    #[tokio::test]
    async fn test_request_missing_etag() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PUT", "/bucket/key")
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let err = UploadPart::new("key", "uid", 1, Bytes::from_static(b"x"))
            .request(&s3(&server.url()))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "missing ETag");
    }
}
