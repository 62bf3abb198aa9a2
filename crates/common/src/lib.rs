//! Shared identifier types for the cart client workspace.

mod types;

pub use types::{CartId, LineId, ProductId, UserId};
