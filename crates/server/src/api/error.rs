//! Uniform JSON error body for every failed request.

use std::time::Duration;

use axum::{
    extract::multipart::MultipartError,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use pdfconvert_core::{EngineError, TargetFormat, ValidationError};

use crate::metrics::REQUEST_REJECTIONS_TOTAL;

/// Body returned with every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub code: String,
    pub message: String,
    pub path: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid multipart request: {0}")]
    MalformedMultipart(String),

    #[error("Unsupported conversion: {0}")]
    UnsupportedPair(String),

    #[error("Failed to convert PDF to {}", .target.label())]
    EngineFailure {
        target: TargetFormat,
        #[source]
        source: EngineError,
    },

    #[error("Conversion to {} timed out after {} ms", .target.label(), .after.as_millis())]
    TimedOut { target: TargetFormat, after: Duration },

    #[error("Conversion to {} is temporarily unavailable, retry later", .target.label())]
    CircuitOpen {
        target: TargetFormat,
        retry_in: Duration,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Maps a multipart stream error, keeping body-limit hits as oversize uploads.
    pub fn from_multipart(err: MultipartError, max_file_size: u64) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::Validation(ValidationError::TooLarge {
                size: max_file_size.saturating_add(1),
                max: max_file_size,
            });
        }
        Self::MalformedMultipart(err.body_text())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(ValidationError::TooLarge { .. }) => StatusCode::BAD_REQUEST,
            Self::Validation(ValidationError::WrongType { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::Validation(ValidationError::MissingFile) => StatusCode::BAD_REQUEST,
            Self::MalformedMultipart(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedPair(_) => StatusCode::NOT_FOUND,
            Self::EngineFailure { .. }
            | Self::TimedOut { .. }
            | Self::CircuitOpen { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::TooLarge { .. }) => "VAL-ERR-001",
            Self::Validation(ValidationError::WrongType { .. }) => "VAL-ERR-002",
            Self::Validation(ValidationError::MissingFile) => "VAL-ERR-003",
            Self::MalformedMultipart(_) => "VAL-ERR-004",
            Self::EngineFailure { .. } => "CONV-ERR-001",
            Self::CircuitOpen { .. } => "CONV-ERR-002",
            Self::TimedOut { .. } => "CONV-ERR-003",
            Self::UnsupportedPair(_) => "ERR-NOT-FOUND",
            Self::Internal(_) => "ERR-INTERNAL",
        }
    }

    /// Renders the error for the request at `path`.
    pub fn into_response_at(self, path: &str) -> Response {
        let status = self.status();
        let code = self.code();
        REQUEST_REJECTIONS_TOTAL.with_label_values(&[code]).inc();

        if status.is_server_error() {
            match &self {
                Self::EngineFailure { source, .. } => {
                    error!(code, path, error = %self, cause = %source, "Request failed")
                }
                _ => error!(code, path, error = %self, "Request failed"),
            }
        } else {
            warn!(code, path, error = %self, "Request rejected");
        }

        let retry_after = match &self {
            Self::CircuitOpen { retry_in, .. } => Some(retry_after_secs(*retry_in)),
            _ => None,
        };

        let body = ErrorResponse {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: code.to_string(),
            message: self.to_string(),
            path: path.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Whole seconds, rounded up and never zero.
fn retry_after_secs(retry_in: Duration) -> u64 {
    let secs = retry_in.as_secs() + u64::from(retry_in.subsec_nanos() > 0);
    secs.max(1)
}
