//! Wire schema and the single normalization step applied on receipt.
//!
//! The storefront backend is loose about envelope shapes: the cart may come
//! back as `{ data: { cart } }`, `{ data: cart }` or `{ data: { items } }`,
//! products as `{ data: { product } }` or `{ data: product }`, and a cart
//! line may embed its product, reference it by id, or both. Everything in
//! this module turns those shapes into one canonical form so the engine never
//! inspects raw JSON.

use chrono::{DateTime, Utc};
use common::{CartId, LineId, ProductId, UserId};
use domain::{Cart, CartLine, Money, Product};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{RemoteError, Result};
use crate::services::auth::User;

/// The `{ success, data, message, error }` envelope every endpoint uses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiEnvelope {
    fn reason(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

/// Canonical cart payload produced from any tolerated response shape.
///
/// Every field is optional: mutation responses may carry only some of them,
/// and the engine decides what to keep from its local state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    pub id: Option<CartId>,
    pub user_id: Option<UserId>,
    /// `None` when the response carried no item list at all.
    pub lines: Option<Vec<CartLine>>,
    pub total: Option<Money>,
    pub item_count: Option<u32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartSnapshot {
    /// Builds a full cart from a fetch response.
    ///
    /// A bare item list carries no cart id; the cart then has an empty id and
    /// the backend resolves the cart from the session instead.
    pub fn into_cart(self, now: DateTime<Utc>) -> Cart {
        Cart::reconcile(
            self.id.unwrap_or_else(|| CartId::new("")),
            self.user_id.unwrap_or_else(|| UserId::new("")),
            self.lines.unwrap_or_default(),
            self.total,
            self.item_count,
            self.updated_at.unwrap_or(now),
        )
    }

    /// Overlays a mutation response on `base`.
    ///
    /// Fields the response carries replace those of `base`; when it carries no
    /// item list the lines of `base` are kept. Aggregates missing from the
    /// response are recomputed from the resulting lines.
    pub fn apply_to(self, base: &Cart) -> Cart {
        Cart::reconcile(
            self.id.unwrap_or_else(|| base.id().clone()),
            self.user_id.unwrap_or_else(|| base.user_id().clone()),
            self.lines.unwrap_or_else(|| base.lines().to_vec()),
            self.total,
            self.item_count,
            self.updated_at.unwrap_or_else(|| base.updated_at()),
        )
    }
}

/// Validates an HTTP response and returns its envelope `data`.
///
/// 401/403 map to `Unauthorized`, other non-2xx statuses to `Status`, and a
/// 2xx body without `success: true` to `Rejected`.
pub fn check_response(status: u16, body: &[u8]) -> Result<Option<Value>> {
    if status == 401 || status == 403 {
        return Err(RemoteError::Unauthorized { status });
    }

    let parsed: std::result::Result<ApiEnvelope, _> = serde_json::from_slice(body);

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|e| e.reason())
            .unwrap_or_else(|| format!("HTTP {status}"));
        if status == 404 {
            return Err(RemoteError::NotFound(message));
        }
        return Err(RemoteError::Status { status, message });
    }

    let envelope = parsed?;
    if !envelope.success {
        return Err(RemoteError::Rejected(
            envelope
                .reason()
                .unwrap_or_else(|| "Operation failed".to_string()),
        ));
    }

    Ok(envelope.data.filter(|d| !d.is_null()))
}

/// Normalizes a cart envelope `data` into the canonical snapshot.
///
/// Returns `None` when the response carried no cart at all.
pub fn normalize_cart(data: Option<Value>, now: DateTime<Utc>) -> Result<Option<CartSnapshot>> {
    let Some(data) = data else {
        return Ok(None);
    };

    match data {
        Value::Array(items) => Ok(Some(CartSnapshot {
            lines: Some(normalize_lines(items, now)?),
            ..CartSnapshot::default()
        })),
        Value::Object(mut map) => {
            let body = match map.remove("cart") {
                Some(Value::Object(cart)) => cart,
                Some(Value::Null) | None => map,
                Some(other) => {
                    return Err(RemoteError::Shape(format!(
                        "cart is neither an object nor null: {other}"
                    )));
                }
            };
            Ok(Some(normalize_cart_object(body, now)?))
        }
        other => Err(RemoteError::Shape(format!(
            "cart payload is neither an object nor an array: {other}"
        ))),
    }
}

fn normalize_cart_object(
    mut body: serde_json::Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<CartSnapshot> {
    let lines = match body.remove("items") {
        Some(Value::Array(items)) => Some(normalize_lines(items, now)?),
        _ => None,
    };

    let id = body
        .get("id")
        .or_else(|| body.get("_id"))
        .and_then(id_of)
        .map(CartId::new);
    let user_id = body
        .get("userId")
        .or_else(|| body.get("user"))
        .and_then(id_of)
        .map(UserId::new);
    let total = body
        .get("total")
        .and_then(Value::as_f64)
        .map(Money::from_rupees_f64);
    let item_count = body
        .get("itemCount")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());
    let updated_at = body
        .get("updatedAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(CartSnapshot {
        id,
        user_id,
        lines,
        total,
        item_count,
        updated_at,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLine {
    #[serde(default, alias = "_id")]
    id: Option<String>,
    #[serde(default)]
    product_id: Option<Value>,
    #[serde(default)]
    product: Option<Value>,
    #[serde(default)]
    quantity: u32,
    #[serde(default)]
    price: Option<Money>,
}

/// Lines with a zero quantity are dropped: a held line has quantity >= 1.
fn normalize_lines(items: Vec<Value>, now: DateTime<Utc>) -> Result<Vec<CartLine>> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let wire: WireLine = serde_json::from_value(item)?;
        if wire.quantity == 0 {
            continue;
        }
        lines.push(normalize_line(wire, now)?);
    }
    Ok(lines)
}

fn normalize_line(wire: WireLine, now: DateTime<Utc>) -> Result<CartLine> {
    // `productId` is sometimes populated with the whole product document.
    let (product_ref, product_doc) = match (wire.product_id, wire.product) {
        (Some(Value::Object(doc)), None) => (None, Some(Value::Object(doc))),
        (id, doc) => (id, doc),
    };

    let embedded = match product_doc {
        Some(doc @ Value::Object(_)) => decode_embedded_product(doc),
        Some(Value::String(id)) => EmbeddedProduct::Reference(ProductId::new(id)),
        _ => EmbeddedProduct::Absent,
    };

    let product_id = product_ref
        .as_ref()
        .and_then(id_of)
        .map(ProductId::new)
        .or_else(|| embedded.product_id())
        .ok_or_else(|| RemoteError::Shape("cart line without a product id".to_string()))?;

    let product = match embedded {
        EmbeddedProduct::Full(product) => Some(product),
        _ => None,
    };

    // Left unset when absent; the engine prices it from the previous cart or
    // the looked-up product.
    let price = wire.price.or_else(|| product.as_ref().map(|p| p.price));

    let id = wire
        .id
        .filter(|id| !id.is_empty())
        .map(LineId::new)
        .unwrap_or_else(|| LineId::synthesize(&product_id, now.timestamp_millis()));

    Ok(CartLine {
        id,
        product_id,
        product,
        quantity: wire.quantity,
        price,
    })
}

enum EmbeddedProduct {
    Full(Product),
    Reference(ProductId),
    Absent,
}

impl EmbeddedProduct {
    fn product_id(&self) -> Option<ProductId> {
        match self {
            EmbeddedProduct::Full(p) => Some(p.id.clone()),
            EmbeddedProduct::Reference(id) => Some(id.clone()),
            EmbeddedProduct::Absent => None,
        }
    }
}

/// A partially populated product document still yields its id, so the line
/// can be enriched later.
fn decode_embedded_product(doc: Value) -> EmbeddedProduct {
    let id = id_of(&doc).map(ProductId::new);
    match serde_json::from_value::<Product>(doc) {
        Ok(product) => EmbeddedProduct::Full(product),
        Err(_) => id
            .map(EmbeddedProduct::Reference)
            .unwrap_or(EmbeddedProduct::Absent),
    }
}

/// Normalizes a product lookup `data` (`{ product }` or the product itself).
pub fn normalize_product(data: Option<Value>) -> Result<Product> {
    let data = data.ok_or_else(|| RemoteError::Shape("product response without data".into()))?;
    let doc = match data {
        Value::Object(mut map) => match map.remove("product") {
            Some(product @ Value::Object(_)) => product,
            _ => Value::Object(map),
        },
        other => other,
    };
    Ok(serde_json::from_value(doc)?)
}

/// Extracts a user from an `/auth/me` body.
///
/// Accepted shapes, first match wins: `data.user`, `user`, `data`, the body
/// itself. A candidate without an id is not a user.
pub fn normalize_user(body: &Value) -> Option<User> {
    let candidates = [
        body.get("data").and_then(|d| d.get("user")),
        body.get("user"),
        body.get("data"),
        Some(body),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_object() && id_of(candidate).is_some())
        .and_then(|candidate| serde_json::from_value(candidate.clone()).ok())
}

/// Returns the id of a value that is either an id string or a document with
/// an `id`/`_id` field.
fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("id")
            .or_else(|| map.get("_id"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}
