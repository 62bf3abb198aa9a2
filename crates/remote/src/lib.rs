//! Remote collaborators of the cart engine.
//!
//! The storefront backend exposes three concerns the engine depends on:
//! - `CartService`: the persisted cart of the signed-in user
//! - `ProductCatalog`: product detail lookups used for enrichment
//! - `AuthService`: session resolution (`/auth/me`) and logout
//!
//! Each has an in-memory implementation with failure injection for tests,
//! and `HttpClient` implements all three over `reqwest`. Responses are
//! normalized once, in `wire`, into canonical types.

pub mod error;
pub mod http;
pub mod services;
pub mod wire;

pub use error::{RemoteError, Result};
pub use http::HttpClient;
pub use services::{
    AuthFailure, AuthService, CartService, Credentials, InMemoryAuthService, InMemoryCartService,
    InMemoryProductCatalog, ProductCatalog, Role, User,
};
pub use wire::CartSnapshot;
