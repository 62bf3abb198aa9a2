//! Cart domain model for the UniCart client.
//!
//! This crate provides the data the cart synchronization engine works on:
//! - `Money` in integer paise with a rupee wire format
//! - `Product` snapshots and the placeholder used when a lookup fails
//! - `Cart` / `CartLine` with the totals fold and the optimistic mutations
//!   (`with_quantity`, `without_product`, `cleared`) applied before a
//!   network round trip
//! - `OrderSummary` for the subtotal/shipping breakdown

pub mod cart;
pub mod error;
pub mod money;
pub mod product;
pub mod summary;

pub use cart::{Cart, CartLine};
pub use error::CartError;
pub use money::Money;
pub use product::{Condition, PLACEHOLDER_TITLE, Product, ProductStatus, SellerSummary};
pub use summary::{FREE_SHIPPING_THRESHOLD, OrderSummary, SHIPPING_FEE};
