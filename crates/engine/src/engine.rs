//! The cart engine: local cart state kept in sync with the backend.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use common::ProductId;
use domain::{Cart, CartError, OrderSummary};
use remote::{CartService, CartSnapshot, HttpClient, ProductCatalog, RemoteError};
use tokio::sync::{Mutex, RwLock};

use crate::config::{EngineConfig, FetchFailurePolicy};
use crate::enrichment::enrich;
use crate::error::{EngineError, Result};
use crate::notifier::{Notification, Notifier, TracingNotifier};
use crate::session::Session;

/// Observable engine state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    /// `None` when signed out or not loaded yet.
    pub cart: Option<Cart>,
    /// True while a fetch is in flight.
    pub loading: bool,
}

/// Client-side cart synchronization engine.
///
/// Holds the signed-in user's cart and turns user intents into backend
/// calls. Update, remove and clear are applied optimistically: the local
/// cart changes before the call is made and is restored verbatim if it
/// fails. Add is not optimistic; it refetches the cart once the server
/// accepted it.
///
/// Mutating intents run one at a time, in arrival order.
pub struct CartEngine<C, P, N> {
    cart_service: C,
    catalog: P,
    notifier: N,
    session: Arc<Session>,
    fetch_failure_policy: FetchFailurePolicy,
    state: Arc<RwLock<CartState>>,
    gate: Mutex<()>,
}

impl CartEngine<HttpClient, HttpClient, TracingNotifier> {
    /// Creates an engine over `client`, which should be the same client the
    /// `SessionManager` uses so that cookies and the bearer token are shared.
    pub fn over_http(client: HttpClient, config: &EngineConfig, session: Arc<Session>) -> Self {
        Self::new(client.clone(), client, TracingNotifier, session)
            .with_fetch_failure_policy(config.fetch_failure_policy)
    }
}

impl<C, P, N> CartEngine<C, P, N>
where
    C: CartService,
    P: ProductCatalog,
    N: Notifier,
{
    pub fn new(cart_service: C, catalog: P, notifier: N, session: Arc<Session>) -> Self {
        Self {
            cart_service,
            catalog,
            notifier,
            session,
            fetch_failure_policy: FetchFailurePolicy::default(),
            state: Arc::new(RwLock::new(CartState::default())),
            gate: Mutex::new(()),
        }
    }

    pub fn with_fetch_failure_policy(mut self, policy: FetchFailurePolicy) -> Self {
        self.fetch_failure_policy = policy;
        self
    }

    /// Returns a handle for observing the state while intents run.
    pub fn state(&self) -> Arc<RwLock<CartState>> {
        self.state.clone()
    }

    /// Returns a copy of the current cart.
    pub async fn cart(&self) -> Option<Cart> {
        self.state.read().await.cart.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// Returns the checkout summary of the current cart.
    pub async fn summary(&self) -> Option<OrderSummary> {
        self.state.read().await.cart.as_ref().map(OrderSummary::for_cart)
    }

    /// Reloads the cart from the backend. Returns false on failure.
    pub async fn fetch(&self) -> bool {
        let result = self.try_fetch().await;
        self.settle_intent("fetch", result)
    }

    /// Adds `quantity` units of a product. Returns false on failure.
    pub async fn add_item(&self, product_id: &ProductId, quantity: u32) -> bool {
        let result = self.try_add_item(product_id, quantity).await;
        self.settle_intent("add", result)
    }

    /// Sets a line's quantity; zero removes the line. Returns false on failure.
    pub async fn update_item(&self, product_id: &ProductId, quantity: u32) -> bool {
        let result = self.try_update_item(product_id, quantity).await;
        self.settle_intent("update", result)
    }

    /// Removes a product's line. Returns false on failure.
    pub async fn remove_item(&self, product_id: &ProductId) -> bool {
        let result = self.try_remove_item(product_id).await;
        self.settle_intent("remove", result)
    }

    /// Empties the cart. Returns false on failure.
    pub async fn clear_cart(&self) -> bool {
        let result = self.try_clear_cart().await;
        self.settle_intent("clear", result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn try_fetch(&self) -> Result<()> {
        metrics::counter!("cart_intents_total", "op" => "fetch").increment(1);
        let _gate = self.gate.lock().await;
        self.fetch_locked().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn try_add_item(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        metrics::counter!("cart_intents_total", "op" => "add").increment(1);
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity }.into());
        }
        if !self.session.is_authenticated() {
            return Err(EngineError::AuthRequired);
        }

        let _gate = self.gate.lock().await;
        if let Some(cart) = self.state.read().await.cart.as_ref() {
            let requested = cart.quantity_after_add(product_id, quantity)?;
            cart.validate_quantity(product_id, requested)?;
        }

        self.cart_service.add_item(product_id, quantity).await?;
        tracing::info!(%product_id, quantity, "item added");

        if let Err(e) = self.fetch_locked().await {
            tracing::warn!(error = %e, "refetch after add failed");
            self.notify_failure(&e);
        }
        self.notifier.notify(Notification::info(
            "Added to cart",
            "Item has been added to your cart",
        ));
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn try_update_item(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return self.try_remove_item(product_id).await;
        }
        metrics::counter!("cart_intents_total", "op" => "update").increment(1);

        let _gate = self.gate.lock().await;
        let (snapshot, optimistic) = self
            .apply_optimistic(|cart| {
                cart.validate_quantity(product_id, quantity)?;
                Ok(cart.with_quantity(product_id, quantity))
            })
            .await?;

        let response = self
            .cart_service
            .update_item(snapshot.id(), product_id, quantity)
            .await;
        self.confirm_or_rollback("update", snapshot, optimistic, response)
            .await?;
        tracing::info!(%product_id, quantity, "item quantity updated");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn try_remove_item(&self, product_id: &ProductId) -> Result<()> {
        metrics::counter!("cart_intents_total", "op" => "remove").increment(1);

        let _gate = self.gate.lock().await;
        let (snapshot, optimistic) = self
            .apply_optimistic(|cart| Ok(cart.without_product(product_id)))
            .await?;

        let response = self.cart_service.remove_item(product_id).await;
        self.confirm_or_rollback("remove", snapshot, optimistic, response)
            .await?;
        tracing::info!(%product_id, "item removed");
        self.notifier.notify(Notification::info(
            "Item removed",
            "Item has been removed from your cart",
        ));
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn try_clear_cart(&self) -> Result<()> {
        metrics::counter!("cart_intents_total", "op" => "clear").increment(1);

        let _gate = self.gate.lock().await;
        let (snapshot, optimistic) = self.apply_optimistic(|cart| Ok(cart.cleared())).await?;

        let response = self.cart_service.clear().await;
        self.confirm_or_rollback("clear", snapshot, optimistic, response)
            .await?;
        tracing::info!("cart cleared");
        self.notifier.notify(Notification::info(
            "Cart cleared",
            "All items have been removed from your cart",
        ));
        Ok(())
    }

    /// Must be called with the gate held.
    async fn fetch_locked(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            self.state.write().await.cart = None;
            return Ok(());
        }

        self.state.write().await.loading = true;
        let started = Instant::now();
        let result = self.load_cart().await;
        metrics::histogram!("cart_fetch_duration_seconds").record(started.elapsed().as_secs_f64());

        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(cart) => {
                tracing::debug!(lines = cart.as_ref().map_or(0, |c| c.lines().len()), "cart loaded");
                state.cart = cart;
                Ok(())
            }
            Err(e) => {
                if self.fetch_failure_policy == FetchFailurePolicy::Clear {
                    state.cart = None;
                }
                Err(e)
            }
        }
    }

    async fn load_cart(&self) -> Result<Option<Cart>> {
        let Some(snapshot) = self.cart_service.get_cart().await? else {
            return Ok(None);
        };
        let server_total = snapshot.total.is_some();
        let mut cart = snapshot.into_cart(Utc::now());
        enrich(&self.catalog, &mut cart).await;
        settle_prices(&mut cart, server_total);
        Ok(Some(cart))
    }

    /// Replaces the cart with `change(cart)` and returns the prior cart along
    /// with the optimistic one. Must be called with the gate held.
    async fn apply_optimistic<F>(&self, change: F) -> Result<(Cart, Cart)>
    where
        F: FnOnce(&Cart) -> Result<Cart>,
    {
        let mut state = self.state.write().await;
        let current = state.cart.as_ref().ok_or(EngineError::NoCart)?;
        let optimistic = change(current)?;
        let snapshot = std::mem::replace(&mut state.cart, Some(optimistic.clone()));
        Ok((snapshot.ok_or(EngineError::NoCart)?, optimistic))
    }

    /// Settles an optimistic mutation.
    ///
    /// On success the response is overlaid on the optimistic cart, lines that
    /// came back without product detail or price get them from `snapshot`,
    /// and anything still missing is looked up. On failure `snapshot` is
    /// restored.
    async fn confirm_or_rollback(
        &self,
        op: &'static str,
        snapshot: Cart,
        optimistic: Cart,
        response: std::result::Result<Option<CartSnapshot>, RemoteError>,
    ) -> Result<()> {
        match response {
            Ok(response) => {
                let (mut next, server_total) = match response {
                    Some(response) => {
                        let server_total = response.total.is_some();
                        (response.apply_to(&optimistic), server_total)
                    }
                    None => (optimistic, false),
                };
                next.backfill_products(&snapshot);
                enrich(&self.catalog, &mut next).await;
                settle_prices(&mut next, server_total);
                self.state.write().await.cart = Some(next);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(op, error = %e, "mutation failed, restoring cart");
                metrics::counter!("cart_rollbacks_total", "op" => op).increment(1);
                self.state.write().await.cart = Some(snapshot);
                Err(e.into())
            }
        }
    }

    fn settle_intent(&self, op: &'static str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(op, error = %e, "cart intent failed");
                self.notify_failure(&e);
                false
            }
        }
    }

    fn notify_failure(&self, error: &EngineError) {
        let notification = match error {
            EngineError::AuthRequired => Notification::error(
                "Please sign in",
                "You need to be logged in to add items to cart",
            ),
            other => Notification::error("Error", other.to_string()),
        };
        self.notifier.notify(notification);
    }
}

/// Prices lines the server sent without a price from their product and,
/// unless the server supplied its own total, refolds the total.
fn settle_prices(cart: &mut Cart, server_total: bool) {
    let priced = cart.price_from_products();
    if priced > 0 {
        tracing::debug!(priced, "priced lines from product detail");
    }
    if !server_total {
        cart.recompute_total();
    }
}
