//! API error types
//!
//! Maps `AppError` onto HTTP status codes with an `{"error": ...}` body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::AppError;

/// Handler error wrapping the library error.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            e if e.is_auth() => StatusCode::UNAUTHORIZED,
            AppError::NoSiteConfigured => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.0.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error_message = %body.error, status = %status, "API error");
        } else {
            tracing::warn!(error_message = %body.error, status = %status, "API error");
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = |e: AppError| ApiError(e).status_code();

        assert_eq!(status(AppError::NotAuthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(AppError::AuthFailed("invalid_grant".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status(AppError::NoSiteConfigured), StatusCode::NOT_FOUND);
        assert_eq!(
            status(AppError::validation("months must be at most 16")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(AppError::upstream(503, "backend error")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(AppError::storage("lock poisoned")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
