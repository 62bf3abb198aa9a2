//! In-memory storefront backend for local development and tests.
//!
//! Serves the cart, product and auth endpoints the cart engine talks to,
//! with structured logging (tracing) and Prometheus metrics. Sessions are
//! resolved from `Authorization: Bearer {user id}` or a `token` cookie.

pub mod config;
pub mod error;
pub mod routes;
pub mod store;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use store::Store;

/// Shared application state accessible from all handlers.
#[derive(Debug, Default)]
pub struct AppState {
    pub store: Store,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/cart", get(routes::cart::get))
        .route("/cart/add", post(routes::cart::add))
        .route("/cart/update", put(routes::cart::update))
        .route("/cart/remove/{product_id}", delete(routes::cart::remove))
        .route("/cart/clear", delete(routes::cart::clear))
        .route("/products", get(routes::products::list))
        .route("/products/{id}", get(routes::products::get));

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state, seeded with the demo catalog when asked.
pub fn create_default_state(seed_demo_data: bool) -> Arc<AppState> {
    let store = if seed_demo_data {
        Store::with_demo_data()
    } else {
        Store::new()
    };
    Arc::new(AppState { store })
}
