//! API error handling module
//!
//! Provides a unified error type for the page endpoints. Internal detail
//! (paths, engine diagnostics) is logged and never returned to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pageocr_core::{OcrError, PageError};
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden - rejected by the access gate
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Error from the page store or OCR engine
    #[error("Page error: {0}")]
    Page(#[from] PageError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Page(ref e) => match e {
                PageError::InvalidIdentifier(_) | PageError::UnsupportedExtension { .. } => {
                    StatusCode::BAD_REQUEST
                }
                PageError::Storage { .. } | PageError::Generation(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Page(ref e) => match e {
                PageError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
                PageError::UnsupportedExtension { .. } => "UNSUPPORTED_EXTENSION",
                PageError::Storage { .. } => "STORAGE_FAILURE",
                PageError::Generation(ocr) => match ocr {
                    OcrError::Timeout(_) => "OCR_TIMEOUT",
                    OcrError::Launch(_) => "OCR_UNAVAILABLE",
                    OcrError::NonZeroExit { .. }
                    | OcrError::OutputMissing(_)
                    | OcrError::Aborted(_) => "GENERATION_FAILED",
                },
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Page(ref e) => match e {
                PageError::InvalidIdentifier(_) => "Invalid page identifier".to_string(),
                PageError::UnsupportedExtension { allowed, .. } => {
                    format!("Unsupported image extension (allowed: {allowed})")
                }
                PageError::Storage { .. } => "Page storage failure".to_string(),
                PageError::Generation(OcrError::Timeout(_)) => {
                    "Transcript generation timed out".to_string()
                }
                PageError::Generation(_) => "Transcript generation failed".to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Forbidden(_) => "forbidden",
            Self::Page(ref e) if e.is_client_error() => "bad_request",
            Self::Page(PageError::Storage { .. }) => "storage",
            Self::Page(_) => "generation",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        if status.is_client_error() {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        } else {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Server error"
            );
        }

        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
