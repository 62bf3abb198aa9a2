//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::store::StoreError;

/// API-level error type that maps to HTTP responses.
///
/// Every error renders as `{ "success": false, "message": ... }`, the
/// envelope the storefront clients expect.
#[derive(Debug)]
pub enum ApiError {
    /// No valid session cookie or bearer token.
    Unauthorized,
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Store operation rejected.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(err) => store_error_to_response(err),
        };

        let body = serde_json::json!({ "success": false, "message": message });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::ProductNotFound(_) | StoreError::CartNotFound | StoreError::ItemNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        StoreError::ProductUnavailable(_)
        | StoreError::InvalidQuantity
        | StoreError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
