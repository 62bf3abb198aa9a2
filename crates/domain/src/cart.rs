//! Cart and cart line types.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use common::{CartId, LineId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::CartError;
use crate::money::Money;
use crate::product::Product;

/// One product-and-quantity entry within a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Server-assigned id, or `{product_id}-{millis}` when the server sent none.
    pub id: LineId,

    pub product_id: ProductId,

    /// Embedded product detail; `None` until the line is enriched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,

    /// Always at least 1 for lines held by a cart.
    pub quantity: u32,

    /// Unit price captured when the item was added; `None` when the server
    /// sent the line with neither a price nor product detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
}

impl CartLine {
    /// Creates a line without embedded product detail.
    pub fn new(
        id: impl Into<LineId>,
        product_id: impl Into<ProductId>,
        quantity: u32,
        price: Money,
    ) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            product: None,
            quantity,
            price: Some(price),
        }
    }

    /// Creates a line whose unit price is not known yet.
    pub fn unpriced(
        id: impl Into<LineId>,
        product_id: impl Into<ProductId>,
        quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            product: None,
            quantity,
            price: None,
        }
    }

    /// Returns the line with the given product embedded.
    pub fn with_product(mut self, product: Product) -> Self {
        self.product = Some(product);
        self
    }

    /// Unit price, zero while unknown.
    pub fn unit_price(&self) -> Money {
        self.price.unwrap_or_default()
    }

    /// Returns `price * quantity`.
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply(self.quantity)
    }

    /// Returns true if the line carries product detail.
    pub fn is_enriched(&self) -> bool {
        self.product.is_some()
    }
}

/// A user's cart as held in memory by the client.
///
/// `total` and `item_count` equal the fold over `lines` unless the server
/// supplied its own aggregates (discounts and other server-side pricing
/// rules), in which case those are kept until the next local mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: CartId,
    user_id: UserId,
    #[serde(rename = "items")]
    lines: Vec<CartLine>,
    total: Money,
    item_count: u32,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a cart whose aggregates are computed from its lines.
    pub fn new(
        id: impl Into<CartId>,
        user_id: impl Into<UserId>,
        lines: Vec<CartLine>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self::reconcile(id, user_id, lines, None, None, updated_at)
    }

    /// Creates a cart from server data.
    ///
    /// Aggregates the server supplied are adopted as-is; missing ones are
    /// recomputed from the lines.
    pub fn reconcile(
        id: impl Into<CartId>,
        user_id: impl Into<UserId>,
        lines: Vec<CartLine>,
        total: Option<Money>,
        item_count: Option<u32>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut cart = Self {
            id: id.into(),
            user_id: user_id.into(),
            lines,
            total: Money::zero(),
            item_count: 0,
            updated_at,
        };
        cart.total = total.unwrap_or_else(|| cart.computed_total());
        cart.item_count = item_count.unwrap_or_else(|| cart.computed_item_count());
        cart
    }

    pub fn id(&self) -> &CartId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the line holding the given product, if any.
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    /// Sum of `price * quantity` over the current lines.
    pub fn computed_total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Sum of quantities over the current lines.
    pub fn computed_item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Returns true if the aggregates equal the fold over the lines.
    pub fn totals_consistent(&self) -> bool {
        self.total == self.computed_total() && self.item_count == self.computed_item_count()
    }

    /// Recomputes `total` and `item_count` from the lines.
    pub fn recompute_totals(&mut self) {
        self.total = self.computed_total();
        self.item_count = self.computed_item_count();
    }

    /// Recomputes `total` from the lines, leaving `item_count` as is.
    pub fn recompute_total(&mut self) {
        self.total = self.computed_total();
    }

    /// Replaces the lines with server-returned ones, adopting any aggregates
    /// the server supplied and recomputing the rest.
    pub fn replace_lines(
        &mut self,
        lines: Vec<CartLine>,
        total: Option<Money>,
        item_count: Option<u32>,
    ) {
        self.lines = lines;
        self.total = total.unwrap_or_else(|| self.computed_total());
        self.item_count = item_count.unwrap_or_else(|| self.computed_item_count());
    }

    /// Checks a requested quantity against the line's known stock.
    ///
    /// Lines without product detail, or holding the placeholder product, are
    /// not bounded locally; the server remains the authority for them.
    pub fn validate_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        let known = self
            .line(product_id)
            .and_then(|l| l.product.as_ref())
            .filter(|p| !p.is_placeholder());

        if let Some(product) = known
            && !product.has_stock_for(quantity)
        {
            return Err(CartError::ExceedsStock {
                product_id: product_id.clone(),
                requested: quantity,
                available: product.stock,
            });
        }

        Ok(())
    }

    /// Quantity the product's line would hold after adding `quantity` units.
    pub fn quantity_after_add(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<u32, CartError> {
        let held = self.line(product_id).map_or(0, |l| l.quantity);
        held.checked_add(quantity).ok_or(CartError::QuantityOverflow {
            held,
            added: quantity,
        })
    }

    /// Returns a copy with the given line's quantity set.
    ///
    /// A product not held by the cart leaves the copy unchanged.
    pub fn with_quantity(&self, product_id: &ProductId, quantity: u32) -> Cart {
        let mut next = self.clone();
        for line in next.lines.iter_mut().filter(|l| &l.product_id == product_id) {
            line.quantity = quantity;
        }
        next.recompute_totals();
        next
    }

    /// Returns a copy with the given product's line removed.
    pub fn without_product(&self, product_id: &ProductId) -> Cart {
        let mut next = self.clone();
        next.lines.retain(|l| &l.product_id != product_id);
        next.recompute_totals();
        next
    }

    /// Returns a copy with no lines and zeroed aggregates.
    pub fn cleared(&self) -> Cart {
        let mut next = self.clone();
        next.lines.clear();
        next.total = Money::zero();
        next.item_count = 0;
        next
    }

    /// Fills lines missing product detail or unit price from the matching
    /// line (by product id) of `previous`. Returns how many lines changed.
    pub fn backfill_products(&mut self, previous: &Cart) -> usize {
        let mut filled = 0;
        for line in self
            .lines
            .iter_mut()
            .filter(|l| l.product.is_none() || l.price.is_none())
        {
            let Some(prev) = previous.line(&line.product_id) else {
                continue;
            };
            let mut changed = false;
            if line.product.is_none() && prev.product.is_some() {
                line.product = prev.product.clone();
                changed = true;
            }
            if line.price.is_none() && prev.price.is_some() {
                line.price = prev.price;
                changed = true;
            }
            if changed {
                filled += 1;
            }
        }
        filled
    }

    /// Prices lines that have no unit price from their embedded product.
    /// Placeholder products carry no price and are skipped. Returns how many
    /// lines were priced.
    pub fn price_from_products(&mut self) -> usize {
        let mut priced = 0;
        for line in self.lines.iter_mut().filter(|l| l.price.is_none()) {
            if let Some(product) = line.product.as_ref().filter(|p| !p.is_placeholder()) {
                line.price = Some(product.price);
                priced += 1;
            }
        }
        priced
    }

    /// Returns true if every line has a known unit price.
    pub fn fully_priced(&self) -> bool {
        self.lines.iter().all(|l| l.price.is_some())
    }

    /// Returns true if any line lacks product detail.
    pub fn needs_enrichment(&self) -> bool {
        self.lines.iter().any(|l| l.product.is_none())
    }

    /// Distinct product ids of lines lacking product detail, in line order.
    pub fn unenriched_product_ids(&self) -> Vec<ProductId> {
        let mut seen = HashSet::new();
        self.lines
            .iter()
            .filter(|l| l.product.is_none())
            .filter(|l| seen.insert(l.product_id.clone()))
            .map(|l| l.product_id.clone())
            .collect()
    }

    /// Embeds looked-up products into every line lacking detail whose
    /// product id has an entry in `products`.
    pub fn attach_products(&mut self, products: &HashMap<ProductId, Product>) {
        for line in self.lines.iter_mut().filter(|l| l.product.is_none()) {
            if let Some(product) = products.get(&line.product_id) {
                line.product = Some(product.clone());
            }
        }
    }
}
