//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;

/// GET /api/products: every listing.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Value> {
    let products = state.store.products();
    Json(json!({ "success": true, "data": { "products": products } }))
}

/// GET /api/products/{id}: one listing.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let product = state
        .store
        .product(&ProductId::new(id.as_str()))
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;
    Ok(Json(json!({ "success": true, "data": { "product": product } })))
}
