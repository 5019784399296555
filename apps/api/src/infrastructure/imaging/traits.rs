use crate::domain::image::errors::PipelineError;
use async_trait::async_trait;
use bytes::Bytes;

/// Encoded thumbnail ready to be stored.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
}

#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Produces a bounded copy of `source`. `file_name` is only used for error reporting.
    async fn generate(&self, source: Bytes, file_name: &str) -> Result<Thumbnail, PipelineError>;
}
