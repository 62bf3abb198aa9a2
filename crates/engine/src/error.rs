//! Engine error types.

use domain::CartError;
use remote::RemoteError;
use thiserror::Error;

/// Errors that can occur while handling a cart intent.
///
/// The boolean intent methods of `CartEngine` catch these at the boundary;
/// the `try_*` variants return them.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A mutating intent was issued without an active session.
    #[error("Sign-in required")]
    AuthRequired,

    /// The intent needs a loaded cart and there is none.
    #[error("No cart loaded")]
    NoCart,

    /// Local validation rejected the intent.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The backend call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
