use thiserror::Error;

/// Failures raised by the object store collaborator.
///
/// These are propagated unchanged to the caller. Nothing in the crate retries
/// a storage call.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage responded with {status}{}: {message}", render_code(.code))]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("storage transport error: {0}")]
    Transport(String),
    #[error("request signing failed: {0}")]
    Signing(String),
    #[error("unexpected storage response: {0}")]
    Decode(String),
}

fn render_code(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

impl StorageError {
    /// Status code carried by the store's answer, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("No usable storage credential: ambient identity failed and no account key is configured")]
    NoAuthAvailable,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Error generating thumbnail for {file_name}: {reason}")]
    UnsupportedImage { file_name: String, reason: String },
    #[error("{operation} did not complete before the deadline")]
    Timeout { operation: String },
    #[error("Internal error: {0}")]
    Internal(String),
}
