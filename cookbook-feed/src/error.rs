//! HTTP error mapping for cookbook-feed

use crate::feed::{FeedError, FieldIssue};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Author and tag filters combined (400)
    #[error("Ambiguous query: {0}")]
    AmbiguousQuery(String),

    /// Unsupported sort field (400)
    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    /// Field-level validation failure (422)
    #[error("Validation failed")]
    Validation(Vec<FieldIssue>),

    /// Conflict (409), e.g. username taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store temporarily unable to answer (503)
    #[error("Service unavailable: {0}")]
    Transient(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Validation(issues) => ApiError::Validation(issues),
            FeedError::AmbiguousQuery => ApiError::AmbiguousQuery(err.to_string()),
            FeedError::InvalidSort(_) => ApiError::InvalidSort(err.to_string()),
            FeedError::Transient(msg) => ApiError::Transient(msg),
            FeedError::Store(inner) => inner.into(),
        }
    }
}

impl From<cookbook_common::Error> for ApiError {
    fn from(err: cookbook_common::Error) -> Self {
        use cookbook_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => {
                error!("Request failed: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, issues) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::AmbiguousQuery(msg) => {
                (StatusCode::BAD_REQUEST, "AMBIGUOUS_QUERY", msg, None)
            }
            ApiError::InvalidSort(msg) => (StatusCode::BAD_REQUEST, "INVALID_SORT", msg, None),
            ApiError::Validation(issues) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION",
                "Invalid input".to_string(),
                Some(issues),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            ApiError::Transient(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "TRANSIENT", msg, None)
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
                None,
            ),
        };

        let body = match issues {
            Some(issues) => json!({
                "error": {
                    "code": error_code,
                    "message": message,
                    "issues": issues,
                }
            }),
            None => json!({
                "error": {
                    "code": error_code,
                    "message": message,
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_errors_map_to_status() {
        let cases = [
            (FeedError::AmbiguousQuery, StatusCode::BAD_REQUEST),
            (FeedError::InvalidSort("x".into()), StatusCode::BAD_REQUEST),
            (FeedError::Transient("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                FeedError::validation("title", "title is required"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                FeedError::Store(cookbook_common::Error::Internal("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_common_errors_map_to_status() {
        let conflict = ApiError::from(cookbook_common::Error::Conflict("taken".into()));
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let bad = ApiError::from(cookbook_common::Error::InvalidInput("short".into()));
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
