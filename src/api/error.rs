//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.
//!
//! Every error is rendered as `{"error": "<message>"}`. Server-side
//! failures get a generic message; the detail only goes to the log.

use axum::{
    extract::rejection::{BytesRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ingest::PayloadError;
use crate::stats::ScopeError;
use crate::storage::StorageError;

/// Content type of every JSON response, errors included
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed client input
    #[error("{0}")]
    BadRequest(String),

    /// Request body exceeded the configured limit
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Known path, unsupported method
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Storage(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ScopeError> for ApiError {
    fn from(err: ScopeError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                error_message = %self,
                "API error occurred"
            );
            "Internal Server Error".to_string()
        } else {
            tracing::debug!(status = status.as_u16(), error_message = %self, "Request rejected");
            self.to_string()
        };

        (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
            Json(ErrorResponse { error: message }),
        )
            .into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
