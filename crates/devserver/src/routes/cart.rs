//! Cart endpoints.
//!
//! `GET /api/cart` embeds product documents in each item. The mutation
//! endpoints answer with bare product ids, so clients must keep the product
//! detail they already hold.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{CartId, ProductId};
use domain::Cart;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::auth::AuthUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub cart_id: Option<CartId>,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Renders a cart the way the storefront backend does: `_id` keys and each
/// item's `product` either a full document or just its id.
fn cart_document(cart: &Cart) -> Value {
    let items: Vec<Value> = cart
        .lines()
        .iter()
        .map(|line| {
            let product = match &line.product {
                Some(product) => json!(product),
                None => json!(line.product_id),
            };
            json!({
                "_id": line.id,
                "product": product,
                "quantity": line.quantity,
                "price": line.price,
            })
        })
        .collect();

    json!({
        "_id": cart.id(),
        "user": cart.user_id(),
        "items": items,
        "total": cart.total(),
        "itemCount": cart.item_count(),
        "updatedAt": cart.updated_at().to_rfc3339(),
    })
}

fn cart_response(cart: &Cart) -> Json<Value> {
    Json(json!({ "success": true, "data": { "cart": cart_document(cart) } }))
}

/// GET /api/cart: the user's cart, or `data: null` before the first add.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Json<Value> {
    match state.store.cart(&user.0.id) {
        Some(cart) => cart_response(&cart),
        None => Json(json!({ "success": true, "data": null })),
    }
}

/// POST /api/cart/add: adds units of a product.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn add(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .add_item(&user.0.id, &req.product_id, req.quantity)?;
    metrics::counter!("devserver_cart_mutations_total", "op" => "add").increment(1);
    tracing::info!(product_id = %req.product_id, quantity = req.quantity, "item added");
    Ok(Json(json!({ "success": true, "message": "Item added to cart" })))
}

/// PUT /api/cart/update: sets a line's quantity.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Value>, ApiError> {
    let cart_id = req.cart_id.unwrap_or_else(|| CartId::new(""));
    let cart = state
        .store
        .update_item(&user.0.id, &cart_id, &req.product_id, req.quantity)?;
    metrics::counter!("devserver_cart_mutations_total", "op" => "update").increment(1);
    Ok(cart_response(&cart))
}

/// DELETE /api/cart/remove/{product_id}: removes a product's line.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if product_id.trim().is_empty() {
        return Err(ApiError::BadRequest("Product id required".to_string()));
    }
    let cart = state
        .store
        .remove_item(&user.0.id, &ProductId::new(product_id))?;
    metrics::counter!("devserver_cart_mutations_total", "op" => "remove").increment(1);
    Ok(cart_response(&cart))
}

/// DELETE /api/cart/clear: empties the cart.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn clear(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let cart = state.store.clear(&user.0.id)?;
    metrics::counter!("devserver_cart_mutations_total", "op" => "clear").increment(1);
    Ok(cart_response(&cart))
}
