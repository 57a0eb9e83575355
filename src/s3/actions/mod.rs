//! Actions
//! <https://docs.aws.amazon.com/AmazonS3/latest/API/API_Operations.html>

use crate::s3::{
    S3,
    responses::ErrorResponse,
    signature::{Signature, encode_segment},
};
use anyhow::Result;
use http::Method;
use quick_xml::de::from_str;
use reqwest::Response;
use std::collections::BTreeMap;
use url::Url;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_HeadObject.html>
mod headobject;
pub use self::headobject::HeadObject;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_GetObject.html>
mod getobject;
pub use self::getobject::GetObject;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_CreateMultipartUpload.html>
mod createmultipartupload;
pub use self::createmultipartupload::CreateMultipartUpload;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_UploadPart.html>
mod uploadpart;
pub use self::uploadpart::UploadPart;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_CompleteMultipartUpload.html>
mod completemultipartupload;
pub use self::completemultipartupload::CompleteMultipartUpload;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_AbortMultipartUpload.html>
mod abortmultipartupload;
pub use self::abortmultipartupload::AbortMultipartUpload;

pub trait Action {
    // headers to send in the request
    fn headers(&self) -> Option<BTreeMap<&str, &str>>;

    // method to use GET/PUT...
    fn http_method(&self) -> Method;

    // URL query pairs
    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>>;

    // URL path
    fn path(&self) -> Option<Vec<&str>>;

    /// # Errors
    ///
    /// Will return `Err` if the signature can not be created
    fn sign(
        &self,
        s3: &S3,
        payload_hash: &str,
        md5: Option<&str>,
        content_length: Option<usize>,
    ) -> Result<(Url, BTreeMap<String, String>)> {
        let mut url = s3.endpoint()?;

        // segments are encoded once here, the canonical URI uses the path as is
        if let Some(path) = self.path() {
            let mut encoded = url.path().trim_end_matches('/').to_string();
            for segment in path {
                encoded.push('/');
                encoded.push_str(&encode_segment(segment));
            }
            url.set_path(&encoded);
        }

        if let Some(pairs) = self.query_pairs().filter(|p| !p.is_empty()) {
            let mut query = url.query_pairs_mut();
            for (k, v) in pairs {
                query.append_pair(k, v);
            }
        }

        let mut signature = Signature::new(s3, self.http_method());
        let headers = signature.sign(&url, payload_hash, md5, content_length, self.headers());

        Ok((url, headers))
    }
}

// keys are sent as they are, only the bucket prefix comes from the endpoint
pub(crate) fn key_path(key: &str) -> Vec<&str> {
    key.split('/').collect()
}

/// Readable error from a non 2xx response
///
/// # Errors
///
/// Will return `Err` if the body can not be read
pub async fn response_error(response: Response) -> Result<String> {
    let mut error: BTreeMap<&str, String> = BTreeMap::new();
    error.insert("HTTP Status Code", response.status().to_string());

    if let Some(x_amz_id_2) = response.headers().get("x-amz-id-2") {
        error.insert("x-amz-id-2", x_amz_id_2.to_str()?.to_string());
    }

    if let Some(rid) = response.headers().get("x-amz-request-id") {
        error.insert("Request ID", rid.to_str()?.to_string());
    }

    let body = response.text().await?;

    if let Ok(e) = from_str::<ErrorResponse>(&body) {
        error.insert("Code", e.code);
        error.insert("Message", e.message);
    } else if !body.is_empty() {
        error.insert("Response", body);
    }

    Ok(error
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<String>>()
        .join(", "))
}
