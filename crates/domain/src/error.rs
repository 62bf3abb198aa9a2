//! Domain error types.

use common::ProductId;
use thiserror::Error;

/// Errors raised by local cart validation, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity must be at least 1.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// Requested quantity is above the product's known stock.
    #[error("Only {available} of {product_id} available, requested {requested}")]
    ExceedsStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Adding to a line would push its quantity past `u32::MAX`.
    #[error("Quantity overflow: {held} held, {added} more requested")]
    QuantityOverflow { held: u32, added: u32 },
}
