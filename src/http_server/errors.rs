//! # API Errors
//!
//! Maps engine failures onto HTTP status codes and a JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::engine::EngineError;
use crate::observability::Logger;

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Engine(err) => match err {
                // 400 Bad Request
                EngineError::InvalidAggregate(_)
                | EngineError::InvalidColumn(_)
                | EngineError::InvalidSession(_) => StatusCode::BAD_REQUEST,

                // 409 Conflict: nothing started in this session
                EngineError::NotStarted => StatusCode::CONFLICT,

                // 502 Bad Gateway: the remote source failed, state untouched
                EngineError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,

                // 503: every session slot busy
                EngineError::TooManySessions(_) => StatusCode::SERVICE_UNAVAILABLE,

                EngineError::CorruptMerge(_) | EngineError::DivisionUndefined => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Engine(err) => err.code(),
            ApiError::InvalidBody(_) => "AQP_INVALID_BODY",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Engine(err) => err.is_retryable(),
            ApiError::InvalidBody(_) => false,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
    pub retryable: bool,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code(),
            status: err.status_code().as_u16(),
            retryable: err.is_retryable(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            let message = self.to_string();
            Logger::error("REQUEST_FAILED", &[("code", self.code()), ("error", message.as_str())]);
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
