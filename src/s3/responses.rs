use serde::{Deserialize, Serialize};

/// <https://docs.aws.amazon.com/AmazonS3/latest/API/ErrorResponses.html>
#[derive(Deserialize, Debug)]
pub struct ErrorResponse {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "Resource")]
    pub resource: Option<String>,
    #[serde(rename = "RequestId")]
    pub request_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct InitiateMultipartUploadResult {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "UploadId")]
    pub upload_id: String,
}

#[derive(Deserialize, Debug)]
pub struct CompleteMultipartUploadResult {
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "ETag")]
    pub e_tag: String,
}

/// Request body of `CompleteMultipartUpload`
#[derive(Serialize, Debug)]
#[serde(rename = "CompleteMultipartUpload")]
pub struct CompleteMultipartUploadRequest<'a> {
    #[serde(rename = "Part")]
    pub parts: Vec<PartRequest<'a>>,
}

#[derive(Serialize, Debug)]
pub struct PartRequest<'a> {
    #[serde(rename = "ETag")]
    pub etag: &'a str,
    #[serde(rename = "PartNumber")]
    pub number: u16,
}
