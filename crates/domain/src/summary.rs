//! Checkout summary derived from a cart.

use serde::Serialize;

use crate::cart::Cart;
use crate::money::Money;

/// Subtotal above which shipping is free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_rupees(500);

/// Flat shipping fee charged below the threshold.
pub const SHIPPING_FEE: Money = Money::from_rupees(50);

/// Totals shown on the cart and checkout pages.
///
/// The subtotal is always folded from the lines (the price captured on each
/// line), independent of any server-supplied cart total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub item_count: u32,
}

impl OrderSummary {
    /// Builds the summary for a cart.
    pub fn for_cart(cart: &Cart) -> Self {
        let subtotal = cart.computed_total();
        let shipping = if cart.is_empty() || subtotal > FREE_SHIPPING_THRESHOLD {
            Money::zero()
        } else {
            SHIPPING_FEE
        };

        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
            item_count: cart.computed_item_count(),
        }
    }

    /// Returns true if the order ships free.
    pub fn ships_free(&self) -> bool {
        self.shipping.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::cart::CartLine;

    fn cart_with(price: i64, quantity: u32) -> Cart {
        Cart::new(
            "c",
            "u",
            vec![CartLine::new("l", "p", quantity, Money::from_rupees(price))],
            Utc::now(),
        )
    }

    #[test]
    fn test_shipping_charged_at_or_below_threshold() {
        let summary = OrderSummary::for_cart(&cart_with(250, 2));
        assert_eq!(summary.subtotal, Money::from_rupees(500));
        assert_eq!(summary.shipping, Money::from_rupees(50));
        assert_eq!(summary.total, Money::from_rupees(550));
        assert!(!summary.ships_free());
    }

    #[test]
    fn test_free_shipping_above_threshold() {
        let summary = OrderSummary::for_cart(&cart_with(501, 1));
        assert!(summary.ships_free());
        assert_eq!(summary.total, Money::from_rupees(501));
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let cart = cart_with(100, 1).cleared();
        let summary = OrderSummary::for_cart(&cart);
        assert!(summary.total.is_zero());
        assert_eq!(summary.item_count, 0);
    }
}
