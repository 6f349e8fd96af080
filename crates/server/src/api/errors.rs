//! API error types mapped to HTTP status codes.
//!
//! Each [`ApiError`] variant maps to a specific HTTP status code and produces
//! a JSON response body `{"error": "message"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use picsearch_core::SearchError;
use serde_json::json;

/// Application-level error type that implements `IntoResponse`.
///
/// Each variant maps to an HTTP status code:
/// - `BadRequest` → 400
/// - `NotFound` → 404
/// - `FailedDependency` → 424
///
/// Local I/O failures (e.g. an upload that cannot be written) are reported as
/// bad requests; no request failure surfaces as a server error.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request parameters (400).
    BadRequest(String),
    /// Asset or collection not found (404).
    NotFound(String),
    /// The embedding service or vector store failed (424).
    FailedDependency(String),
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        let message = err.to_string();
        match err {
            SearchError::AssetPathNotFound(_) => ApiError::NotFound(message),
            e if e.is_collaborator_failure() => ApiError::FailedDependency(message),
            _ => ApiError::BadRequest(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::FailedDependency(msg) => (StatusCode::FAILED_DEPENDENCY, msg),
        };
        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn status_of(err: SearchError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_domain_errors_map_to_client_errors() {
        assert_eq!(status_of(SearchError::Config("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(SearchError::InvalidTopK(0)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(SearchError::UnsupportedIndexFamily("X".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SearchError::AssetPathNotFound(PathBuf::from("uploads/x"))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(SearchError::StoreOperation("boom".into())),
            StatusCode::FAILED_DEPENDENCY
        );
        assert_eq!(
            status_of(SearchError::Connection("down".into())),
            StatusCode::FAILED_DEPENDENCY
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert_eq!(status_of(SearchError::Io(io)), StatusCode::BAD_REQUEST);
    }
}
