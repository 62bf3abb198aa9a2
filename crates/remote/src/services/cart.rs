//! Cart service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, LineId, ProductId, UserId};
use domain::{CartLine, Money, Product};

use crate::error::RemoteError;
use crate::wire::CartSnapshot;

/// Trait for the persisted cart of the authenticated user.
///
/// Every call relies on an ambient session attached by the transport.
/// Responses are already normalized; `None` means the backend returned no
/// cart data.
#[async_trait]
pub trait CartService: Send + Sync {
    /// `GET /cart`.
    async fn get_cart(&self) -> Result<Option<CartSnapshot>, RemoteError>;

    /// `POST /cart/add`. The response body is not trusted.
    async fn add_item(&self, product_id: &ProductId, quantity: u32) -> Result<(), RemoteError>;

    /// `PUT /cart/update`.
    async fn update_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<CartSnapshot>, RemoteError>;

    /// `DELETE /cart/remove/{productId}`.
    async fn remove_item(&self, product_id: &ProductId)
    -> Result<Option<CartSnapshot>, RemoteError>;

    /// `DELETE /cart/clear`.
    async fn clear(&self) -> Result<Option<CartSnapshot>, RemoteError>;
}

#[derive(Debug)]
struct InMemoryCartState {
    cart_id: CartId,
    user_id: UserId,
    created: bool,
    lines: Vec<CartLine>,
    catalog: HashMap<ProductId, Product>,
    next_line: u32,
    embed_on_get: bool,
    omit_prices: bool,
    total_override: Option<Money>,
    fail_on_get: bool,
    fail_on_add: bool,
    fail_on_update: bool,
    fail_on_remove: bool,
    fail_on_clear: bool,
    requests: usize,
}

impl Default for InMemoryCartState {
    fn default() -> Self {
        Self {
            cart_id: CartId::new("CART-0001"),
            user_id: UserId::new("USER-0001"),
            created: false,
            lines: Vec::new(),
            catalog: HashMap::new(),
            next_line: 0,
            embed_on_get: true,
            omit_prices: false,
            total_override: None,
            fail_on_get: false,
            fail_on_add: false,
            fail_on_update: false,
            fail_on_remove: false,
            fail_on_clear: false,
            requests: 0,
        }
    }
}

impl InMemoryCartState {
    /// Mutation responses carry bare product references, as the real
    /// backend's update and remove endpoints do.
    fn snapshot(&self, embed_products: bool) -> CartSnapshot {
        let lines = self
            .lines
            .iter()
            .map(|line| {
                let mut line = line.clone();
                line.product = if embed_products {
                    self.catalog.get(&line.product_id).cloned()
                } else {
                    None
                };
                if self.omit_prices {
                    line.price = line.product.as_ref().map(|p| p.price);
                }
                line
            })
            .collect();

        CartSnapshot {
            id: Some(self.cart_id.clone()),
            user_id: Some(self.user_id.clone()),
            lines: Some(lines),
            total: self.total_override,
            item_count: None,
            updated_at: Some(Utc::now()),
        }
    }

    fn unavailable() -> RemoteError {
        RemoteError::Unavailable("Cart service unavailable".to_string())
    }
}

/// In-memory cart service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartService {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartService {
    /// Creates a new in-memory cart service with no cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a product addable.
    pub fn stock_product(&self, product: Product) {
        self.state
            .write()
            .unwrap()
            .catalog
            .insert(product.id.clone(), product);
    }

    /// Seeds a line directly, creating the cart if needed.
    pub fn seed_line(&self, product_id: impl Into<ProductId>, quantity: u32, price: Money) {
        let mut state = self.state.write().unwrap();
        state.created = true;
        state.next_line += 1;
        let line_id = LineId::new(format!("LINE-{:04}", state.next_line));
        state
            .lines
            .push(CartLine::new(line_id, product_id, quantity, price));
    }

    /// Controls whether `get_cart` embeds product detail (default: true).
    pub fn set_embed_on_get(&self, embed: bool) {
        self.state.write().unwrap().embed_on_get = embed;
    }

    /// Makes responses send lines without a unit price; lines with embedded
    /// product detail are still priced from the product.
    pub fn set_omit_prices(&self, omit: bool) {
        self.state.write().unwrap().omit_prices = omit;
    }

    /// Makes responses carry a server-side total (e.g. after a discount).
    pub fn set_total_override(&self, total: Option<Money>) {
        self.state.write().unwrap().total_override = total;
    }

    /// Configures the service to fail on `get_cart`.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.state.write().unwrap().fail_on_get = fail;
    }

    /// Configures the service to fail on `add_item`.
    pub fn set_fail_on_add(&self, fail: bool) {
        self.state.write().unwrap().fail_on_add = fail;
    }

    /// Configures the service to fail on `update_item`.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.state.write().unwrap().fail_on_update = fail;
    }

    /// Configures the service to fail on `remove_item`.
    pub fn set_fail_on_remove(&self, fail: bool) {
        self.state.write().unwrap().fail_on_remove = fail;
    }

    /// Configures the service to fail on `clear`.
    pub fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().unwrap().fail_on_clear = fail;
    }

    /// Returns the number of requests received, failed ones included.
    pub fn request_count(&self) -> usize {
        self.state.read().unwrap().requests
    }

    /// Returns the server-side quantity of a product, if held.
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.state
            .read()
            .unwrap()
            .lines
            .iter()
            .find(|l| &l.product_id == product_id)
            .map(|l| l.quantity)
    }

    /// Returns the number of server-side lines.
    pub fn line_count(&self) -> usize {
        self.state.read().unwrap().lines.len()
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn get_cart(&self) -> Result<Option<CartSnapshot>, RemoteError> {
        let mut state = self.state.write().unwrap();
        state.requests += 1;

        if state.fail_on_get {
            return Err(InMemoryCartState::unavailable());
        }
        if !state.created {
            return Ok(None);
        }

        let embed = state.embed_on_get;
        Ok(Some(state.snapshot(embed)))
    }

    async fn add_item(&self, product_id: &ProductId, quantity: u32) -> Result<(), RemoteError> {
        let mut state = self.state.write().unwrap();
        state.requests += 1;

        if state.fail_on_add {
            return Err(InMemoryCartState::unavailable());
        }

        let price = state
            .catalog
            .get(product_id)
            .map(|p| p.price)
            .ok_or_else(|| RemoteError::NotFound(format!("Product {product_id} not found")))?;

        state.created = true;
        if let Some(line) = state.lines.iter_mut().find(|l| &l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            state.next_line += 1;
            let line_id = LineId::new(format!("LINE-{:04}", state.next_line));
            state
                .lines
                .push(CartLine::new(line_id, product_id.clone(), quantity, price));
        }

        Ok(())
    }

    async fn update_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<CartSnapshot>, RemoteError> {
        let mut state = self.state.write().unwrap();
        state.requests += 1;

        if state.fail_on_update {
            return Err(InMemoryCartState::unavailable());
        }
        if !cart_id.is_empty() && cart_id != &state.cart_id {
            return Err(RemoteError::NotFound(format!("Cart {cart_id} not found")));
        }

        let line = state
            .lines
            .iter_mut()
            .find(|l| &l.product_id == product_id)
            .ok_or_else(|| RemoteError::NotFound(format!("Item {product_id} not in cart")))?;
        line.quantity = quantity;

        Ok(Some(state.snapshot(false)))
    }

    async fn remove_item(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CartSnapshot>, RemoteError> {
        let mut state = self.state.write().unwrap();
        state.requests += 1;

        if state.fail_on_remove {
            return Err(InMemoryCartState::unavailable());
        }

        state.lines.retain(|l| &l.product_id != product_id);
        Ok(Some(state.snapshot(false)))
    }

    async fn clear(&self) -> Result<Option<CartSnapshot>, RemoteError> {
        let mut state = self.state.write().unwrap();
        state.requests += 1;

        if state.fail_on_clear {
            return Err(InMemoryCartState::unavailable());
        }

        state.lines.clear();
        state.total_override = None;
        Ok(Some(state.snapshot(false)))
    }
}
