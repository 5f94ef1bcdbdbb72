//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use incognibro_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No principal on the request.
    #[error("authentication required")]
    Unauthorized,

    /// Bad request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::BadRequest(_)
            | ApiError::Storage(StorageError::InvalidDomain(_))
            | ApiError::Storage(StorageError::InvalidProfile(_)) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_and_code(err: ApiError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let body = tokio_test::block_on(axum::body::to_bytes(response.into_body(), usize::MAX))
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, body.code)
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            status_and_code(ApiError::Unauthorized),
            (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
        );
        assert_eq!(
            status_and_code(ApiError::Storage(StorageError::InvalidDomain("x".into()))),
            (StatusCode::BAD_REQUEST, "bad_request".to_string())
        );
        assert_eq!(
            status_and_code(ApiError::Storage(StorageError::InvalidProfile("x".into()))),
            (StatusCode::BAD_REQUEST, "bad_request".to_string())
        );
        assert_eq!(
            status_and_code(ApiError::Storage(StorageError::Config("x".into()))),
            (StatusCode::INTERNAL_SERVER_ERROR, "storage_error".to_string())
        );
    }
}
