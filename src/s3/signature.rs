//! S3 signature v4
//! <https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-header-based-auth.html>

use crate::s3::{
    S3,
    tools::{sha256_hex, sha256_hmac, write_hex_bytes},
};
use chrono::prelude::{DateTime, Utc};
use http::Method;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use ring::hmac;
use std::collections::BTreeMap;
use url::Url;

// URI encode every byte except the unreserved characters:
// 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
pub const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug)]
pub struct Signature<'a> {
    auth: &'a S3,
    // The HTTPRequestMethod
    method: Method,
    // The HTTP request headers, lowercase keys
    headers: BTreeMap<String, String>,
    datetime: DateTime<Utc>,
}

impl<'a> Signature<'a> {
    #[must_use]
    pub fn new(s3: &'a S3, method: Method) -> Self {
        Self::new_at(s3, method, Utc::now())
    }

    #[must_use]
    pub const fn new_at(s3: &'a S3, method: Method, datetime: DateTime<Utc>) -> Self {
        Self {
            auth: s3,
            method,
            headers: BTreeMap::new(),
            datetime,
        }
    }

    /// Sign the request and return the headers to send, `authorization`
    /// included.
    ///
    /// `payload_hash` is `HexEncode(Hash(RequestPayload))`.
    pub fn sign(
        &mut self,
        url: &Url,
        payload_hash: &str,
        md5: Option<&str>,
        content_length: Option<usize>,
        extra: Option<BTreeMap<&str, &str>>,
    ) -> BTreeMap<String, String> {
        let current_date = self.datetime.format("%Y%m%d").to_string();
        let current_datetime = self.datetime.format("%Y%m%dT%H%M%SZ").to_string();

        self.add_header("host", &host(url));
        self.add_header("x-amz-date", &current_datetime);
        self.add_header("x-amz-content-sha256", payload_hash);

        if let Some(length) = content_length {
            self.add_header("content-length", &length.to_string());
        }

        if let Some(md5) = md5 {
            self.add_header("content-md5", md5);
        }

        for (k, v) in extra.unwrap_or_default() {
            self.add_header(k, v);
        }

        let signed_headers = self
            .headers
            .keys()
            .map(String::as_str)
            .collect::<Vec<&str>>()
            .join(";");

        // 1. Create a canonical request for Signature Version 4
        //
        //     CanonicalRequest =
        //         HTTPRequestMethod + '\n' +
        //         CanonicalURI + '\n' +
        //         CanonicalQueryString + '\n' +
        //         CanonicalHeaders + '\n' +
        //         SignedHeaders + '\n' +
        //         HexEncode(Hash(RequestPayload))
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method.as_str(),
            canonical_uri(url),
            canonical_query_string(url),
            canonical_headers(&self.headers),
            signed_headers,
            payload_hash
        );

        log::trace!("canonical request:\n{canonical_request}");

        // 2. Create a string to sign for Signature Version 4
        let region = self.auth.region().name();
        let scope = format!("{current_date}/{region}/s3/aws4_request");
        let string_to_sign = string_to_sign(
            &current_datetime,
            &scope,
            &sha256_hex(canonical_request.as_bytes()),
        );

        // 3. Calculate the signature for AWS Signature Version 4
        let signing_key = signature_key(
            self.auth.credentials().aws_secret_access_key(),
            &current_date,
            region,
            "s3",
        );
        let signature = sha256_hmac(signing_key.as_ref(), string_to_sign.as_bytes());

        // 4. Add the signature to the HTTP request
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.auth.credentials().aws_access_key_id(),
            scope,
            signed_headers,
            write_hex_bytes(signature.as_ref())
        );
        self.add_header("authorization", &authorization);

        self.headers.clone()
    }

    pub fn add_header(&mut self, key: &str, value: &str) {
        self.headers
            .insert(key.to_ascii_lowercase(), value.trim().to_string());
    }
}

// host[:port], the port only when it is not the default for the scheme
fn host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    url.port()
        .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"))
}

/// Encode a single path segment (an object key component)
#[must_use]
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, UNRESERVED).to_string()
}

// The path is built from segments already encoded with `encode_segment`, it
// is used verbatim.
#[must_use]
pub fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

// Name and values are URI-encoded individually and sorted by key name after
// encoding.
#[must_use]
pub fn canonical_query_string(url: &Url) -> String {
    let mut pairs = url
        .query_pairs()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(&key, UNRESERVED),
                utf8_percent_encode(&value, UNRESERVED)
            )
        })
        .collect::<Vec<String>>();
    pairs.sort();
    pairs.join("&")
}

fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    headers.iter().fold(String::new(), |mut canonical, (k, v)| {
        canonical.push_str(k);
        canonical.push(':');
        canonical.push_str(v);
        canonical.push('\n');
        canonical
    })
}

// <https://docs.aws.amazon.com/general/latest/gr/sigv4-create-string-to-sign.html>
#[must_use]
pub fn string_to_sign(timestamp: &str, scope: &str, hashed_canonical_request: &str) -> String {
    format!("AWS4-HMAC-SHA256\n{timestamp}\n{scope}\n{hashed_canonical_request}")
}

fn signature_key(secret_access_key: &str, date: &str, region: &str, service: &str) -> hmac::Tag {
    let k_date = sha256_hmac(
        format!("AWS4{secret_access_key}").as_bytes(),
        date.as_bytes(),
    );
    let k_region = sha256_hmac(k_date.as_ref(), region.as_bytes());
    let k_service = sha256_hmac(k_region.as_ref(), service.as_bytes());
    sha256_hmac(k_service.as_ref(), b"aws4_request")
}
