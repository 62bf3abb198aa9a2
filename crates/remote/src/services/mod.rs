//! Remote collaborator traits and in-memory implementations.

pub mod auth;
pub mod cart;
pub mod catalog;

pub use auth::{AuthFailure, AuthService, Credentials, InMemoryAuthService, Role, User};
pub use cart::{CartService, InMemoryCartService};
pub use catalog::{InMemoryProductCatalog, ProductCatalog};
