use crate::s3::{
    S3,
    actions::{Action, key_path, response_error},
    request, tools,
};
use anyhow::{Result, anyhow};
use bytes::Bytes;
use http::Method;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct GetObject<'a> {
    key: &'a str,
    // bytes=start-end or bytes=start-
    range: Option<String>,
}

impl<'a> GetObject<'a> {
    #[must_use]
    pub fn new(key: &'a str) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    /// Inclusive `first..=last` byte positions, open ended when `last` is
    /// `None`
    #[must_use]
    pub fn with_range(mut self, first: u64, last: Option<u64>) -> Self {
        self.range = Some(match last {
            Some(last) => format!("bytes={first}-{last}"),
            None => format!("bytes={first}-"),
        });
        self
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(&self, s3: &S3) -> Result<Bytes> {
        let (url, headers) = &self.sign(s3, &tools::sha256_hex(""), None, None)?;
        let response =
            request::request(s3.client(), url.clone(), self.http_method(), headers, None).await?;

        if response.status().is_success() {
            Ok(response.bytes().await?)
        } else {
            Err(anyhow!(response_error(response).await?))
        }
    }
}

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_GetObject.html>
impl Action for GetObject<'_> {
    fn http_method(&self) -> Method {
        Method::GET
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        let range = self.range.as_deref()?;
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("range", range);
        Some(map)
    }

    fn path(&self) -> Option<Vec<&str>> {
        Some(key_path(self.key))
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }
}
