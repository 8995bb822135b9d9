//! API error handling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use scangate_scheduler::SubmitError;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    /// A submission rejected with a machine-readable reason code.
    Rejected(SubmitError),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            ApiError::Rejected(err) => {
                let status = match err {
                    SubmitError::QueueFull => StatusCode::TOO_MANY_REQUESTS,
                    _ => StatusCode::BAD_REQUEST,
                };
                (
                    status,
                    json!({ "error": err.reason_code(), "detail": err.to_string() }),
                )
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
        };
        (status, Json(body)).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Store(e) => ApiError::Internal(e.to_string()),
            other => ApiError::Rejected(other),
        }
    }
}

impl From<scangate_store::StoreError> for ApiError {
    fn from(err: scangate_store::StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<scangate_core::Error> for ApiError {
    fn from(err: scangate_core::Error) -> Self {
        match err {
            scangate_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            scangate_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
