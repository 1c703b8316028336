//! API error types and conversions

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::storage::StorageError;
use crate::transport::TransportError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Storage operation failed
    StorageError(String),

    /// Invalid request parameters
    InvalidRequest(String),

    /// Resource not found
    NotFound(String),

    /// The command could not be handed to the broker
    CommandFailed(String),

    /// Internal server error
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::StorageError(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::CommandFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ApiError::StorageError(msg)
            | ApiError::InvalidRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::CommandFailed(msg)
            | ApiError::Internal(msg) => msg,
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::StorageError(err.to_string())
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::CommandFailed(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
