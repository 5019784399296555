//! HTTP error handling and response conversion.
//!
//! Pipeline failures are mapped to status codes here and rendered as
//! `{"error": "..."}` bodies carrying a user-safe message. The full error is
//! logged, never returned.

use crate::domain::image::errors::PipelineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Application-level errors returned from handlers.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request, e.g. a multipart body without files (400).
    BadRequest(String),

    /// Upload is empty or not an image (415).
    UnsupportedMediaType(String),

    /// The image could not be decoded or re-encoded (400).
    UnprocessableImage(String),

    /// Neither managed identity nor an account key could be used (500).
    NoCredential,

    /// The object store failed or refused the request (502).
    Storage(String),

    /// A storage, identity or codec call exceeded its deadline (504).
    Timeout(String),

    /// Unclassified internal error (500).
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::UnsupportedMediaType(msg) => write!(f, "Unsupported media type: {}", msg),
            Self::UnprocessableImage(msg) => write!(f, "Image processing error: {}", msg),
            Self::NoCredential => write!(f, "No usable storage credential"),
            Self::Storage(msg) => write!(f, "Storage error: {}", msg),
            Self::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::UnprocessableImage(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NoCredential | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Get a user-safe error message (without implementation details).
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => msg.clone(),
            Self::UnsupportedMediaType(_) => "Unsupported media type".into(),
            Self::UnprocessableImage(msg) => msg.clone(),
            Self::NoCredential => "Storage is not configured correctly".into(),
            Self::Storage(_) => "Storage operation failed".into(),
            Self::Timeout(_) => "Storage did not respond in time".into(),
            Self::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.user_message();

        if status.is_server_error() {
            tracing::error!("error={}", self);
        } else {
            tracing::warn!("error={}", self);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

// === Pipeline Error Conversion ===

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(msg) => AppError::UnsupportedMediaType(msg),
            PipelineError::UnsupportedImage { .. } => AppError::UnprocessableImage(err.to_string()),
            PipelineError::NoAuthAvailable => AppError::NoCredential,
            PipelineError::Storage(e) => {
                tracing::error!(status = ?e.status(), storage_error = %e);
                AppError::Storage(e.to_string())
            }
            PipelineError::Timeout { operation } => AppError::Timeout(operation),
            PipelineError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
