//! HTTP error mapping for the Gatherly API.
//!
//! Domain and storage errors are converted into [`ApiError`] values, which
//! render as a problem JSON body (`{"error": {"code", "message"}}`) with the
//! matching HTTP status.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatherly_core::CoreError;
use gatherly_registration::RegistrationError;
use gatherly_storage::StorageError;

/// Problem document returned on every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Problem {
    pub error: ProblemDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblemDetail {
    /// Stable machine-readable code: invalid | not-found | conflict | full |
    /// not-supported | unavailable | exception
    pub code: String,
    /// Human-readable description
    pub message: String,
}

impl Problem {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ProblemDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// High-level API errors to be mapped to HTTP responses and problem bodies
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Full: {0}")]
    Full(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn full(msg: impl Into<String>) -> Self {
        Self::Full(msg.into())
    }
    pub fn unsupported_media_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedMediaType(msg.into())
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::Full(_) => StatusCode::CONFLICT,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_problem(&self) -> Problem {
        match self {
            ApiError::BadRequest(msg) => Problem::new("invalid", msg),
            ApiError::NotFound(msg) => Problem::new("not-found", msg),
            ApiError::Conflict(msg) => Problem::new("conflict", msg),
            ApiError::Full(msg) => Problem::new("full", msg),
            ApiError::UnsupportedMediaType(msg) => Problem::new("not-supported", msg),
            ApiError::Unavailable(msg) => Problem::new("unavailable", msg),
            ApiError::Internal(msg) => Problem::new("exception", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let problem = self.to_problem();

        let body = match serde_json::to_vec(&problem) {
            Ok(b) => b,
            Err(_) => {
                let fallback = Problem::new("exception", "Serialization failure");
                serde_json::to_vec(&fallback).unwrap_or_else(|_| b"{}".to_vec())
            }
        };

        let mut builder = axum::http::Response::builder().status(status);
        builder = builder.header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        builder
            .body(axum::body::Body::from(body))
            .unwrap_or_else(|_| {
                axum::http::Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json"),
                    )
                    .body(axum::body::Body::from("{}"))
                    .expect("build fallback response")
            })
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        let message = err.to_string();
        match err {
            RegistrationError::EventNotFound(_) | RegistrationError::UserNotFound(_) => {
                Self::NotFound(message)
            }
            RegistrationError::AlreadyRegistered { .. } => Self::Conflict(message),
            RegistrationError::EventFull(_) => Self::Full(message),
            // The original surface treats this as a plain bad request rather
            // than a 404: the pair was never registered.
            RegistrationError::NotRegistered { .. } => Self::BadRequest(message),
            RegistrationError::Aborted { .. } => Self::Unavailable(message),
            RegistrationError::Storage(storage) => storage.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::NotFound { .. } => Self::NotFound(message),
            StorageError::AlreadyExists { .. } => Self::Conflict(message),
            StorageError::RevisionConflict { .. } => Self::Unavailable(message),
            StorageError::InvalidRecord { .. } => Self::BadRequest(message),
            StorageError::TransactionError { .. }
            | StorageError::ConnectionError { .. }
            | StorageError::Internal { .. } => Self::Internal(message),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}
