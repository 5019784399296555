use super::errors::PipelineError;
use std::fmt;

/// Largest blob name the store accepts.
const MAX_BLOB_NAME_LEN: usize = 1024;

/// Name of a blob inside a container.
///
/// Taken verbatim from the uploaded file name and not deduplicated, so two
/// uploads with the same name overwrite each other. Names with `.` or `..`
/// path segments are refused: URL normalization would move them out of the
/// target container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobName(String);

impl BlobName {
    pub fn new(value: impl Into<String>) -> Result<Self, PipelineError> {
        let value = value.into();
        if value.is_empty() {
            return Err(PipelineError::Validation("File name is required".into()));
        }
        if value.len() > MAX_BLOB_NAME_LEN {
            return Err(PipelineError::Validation(format!(
                "File name exceeds {} characters",
                MAX_BLOB_NAME_LEN
            )));
        }
        if value.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(PipelineError::Validation(format!(
                "File name {} contains a relative path segment",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A browsable thumbnail link built for a single listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailUrlEntry {
    pub url: String,
    pub signed_query: Option<String>,
}

impl ThumbnailUrlEntry {
    pub fn plain(url: String) -> Self {
        Self {
            url,
            signed_query: None,
        }
    }

    pub fn signed(url: String, query: String) -> Self {
        Self {
            url,
            signed_query: Some(query),
        }
    }

    /// The URL a browser should fetch.
    pub fn href(&self) -> String {
        match &self.signed_query {
            Some(query) => format!("{}?{}", self.url, query),
            None => self.url.clone(),
        }
    }
}
