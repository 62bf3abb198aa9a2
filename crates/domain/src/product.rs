//! Product snapshot as embedded in a cart line.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Title used for the placeholder product substituted when a lookup fails.
pub const PLACEHOLDER_TITLE: &str = "Product Unavailable";

/// Physical condition of a listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    New,
    #[default]
    Used,
}

/// Listing status as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Sold,
    Inactive,
}

/// The seller fields a cart needs for display.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

/// Partial product detail carried by a cart line.
///
/// Only the fields the cart renders are required; everything else the
/// catalog returns is either optional here or ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: Money,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub seller: SellerSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
}

impl Product {
    /// Builds a placeholder for a product whose lookup failed.
    ///
    /// The placeholder keeps the line renderable: it has a title, zero stock
    /// and zero price, and no images.
    pub fn placeholder(id: ProductId) -> Self {
        Self {
            id,
            title: PLACEHOLDER_TITLE.to_string(),
            description: None,
            images: Vec::new(),
            price: Money::zero(),
            stock: 0,
            category: "unknown".to_string(),
            condition: Condition::default(),
            seller: SellerSummary {
                id: UserId::new(""),
                name: "Unknown seller".to_string(),
                verified: false,
                rating: None,
            },
            status: None,
        }
    }

    /// Returns true if this is a placeholder substituted for a failed lookup.
    pub fn is_placeholder(&self) -> bool {
        self.title == PLACEHOLDER_TITLE && self.stock == 0 && self.price.is_zero()
    }

    /// Returns true if `quantity` units can be held in a cart.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}
