//! API error types and responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::core::lifecycle::TransitionError;
use crate::service::ServiceError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            // Conflicts over irreversible transitions report as 400
            // like other rejected requests, under their own code.
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, "CONFLICT", msg.clone()),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid payload: {}", rejection.body_text()))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Transition(TransitionError::Unauthorized(msg)) => {
                ApiError::Unauthorized(msg)
            }
            ServiceError::Transition(TransitionError::Conflict(msg)) => ApiError::Conflict(msg),
            ServiceError::Transition(TransitionError::Validation(msg)) => {
                ApiError::BadRequest(msg)
            }
            ServiceError::Storage(err) => ApiError::Internal(format!("Storage failure: {}", err)),
            ServiceError::CommitFailed { attempts } => {
                ApiError::Internal(format!("State commit failed after {} attempts", attempts))
            }
        }
    }
}
