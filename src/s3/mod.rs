pub mod actions;
pub mod credentials;
pub mod limits;
pub mod region;
pub mod request;
pub mod responses;
pub mod signature;
pub mod tools;
pub use self::{credentials::Credentials, region::Region, signature::Signature};

use anyhow::{Context, Result};
use std::fmt;
use url::Url;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct S3 {
    // AWS Credentials
    credentials: Credentials,
    // AWS Region
    region: Region,
    // bucket name
    bucket: Option<String>,
    // shared connection pool
    client: reqwest::Client,
}

// Amazon S3 API Reference
// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_Operations.html>
impl S3 {
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client can not be built
    pub fn new(credentials: &Credentials, region: &Region, bucket: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("unable to build HTTP client")?;

        Ok(Self {
            credentials: credentials.clone(),
            region: region.clone(),
            bucket,
            client,
        })
    }

    /// Same client and credentials, other bucket
    #[must_use]
    pub fn with_bucket(&self, bucket: &str) -> Self {
        Self {
            bucket: Some(bucket.to_string()),
            ..self.clone()
        }
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    #[must_use]
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Path style URL: `<endpoint>/<bucket>`
    ///
    /// # Errors
    ///
    /// Will return `Err` if the endpoint is not a valid URL
    pub fn endpoint(&self) -> Result<Url> {
        let mut url = Url::parse(&self.region.endpoint())
            .with_context(|| format!("invalid endpoint: {}", self.region.endpoint()))?;

        if let Some(bucket) = &self.bucket {
            url.set_path(bucket);
        }

        Ok(url)
    }
}

impl fmt::Display for S3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "access key: {}\nregion: {}\nbucket: {}",
            self.credentials.aws_access_key_id(),
            self.region,
            self.bucket.as_deref().unwrap_or_default()
        )
    }
}
