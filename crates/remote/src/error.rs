//! Remote collaborator error types.

use thiserror::Error;

/// Errors that can occur when talking to the storefront backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request could not complete (connection, TLS, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The session is missing or was rejected (401/403).
    #[error("Unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The backend base URL cannot be used to build request URLs.
    #[error("Invalid base URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend answered 2xx but without `success: true`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response body could not be decoded.
    #[error("Invalid response format: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response decoded but did not have a usable shape.
    #[error("Unexpected response shape: {0}")]
    Shape(String),

    /// The collaborator is unavailable (used by the in-memory services).
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// Returns true if the error means the session is not (or no longer)
    /// valid, as opposed to a transient failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, RemoteError::Unauthorized { .. })
    }
}

/// Convenience type alias for remote results.
pub type Result<T> = std::result::Result<T, RemoteError>;
