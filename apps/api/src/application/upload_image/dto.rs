use bytes::Bytes;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct UploadImageRequest {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Serialize)]
pub struct UploadImagesResponse {
    pub uploaded: Vec<String>,
}
