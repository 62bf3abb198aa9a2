//! Product lookup trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use domain::Product;

use crate::error::RemoteError;

/// Trait for product detail lookups used to enrich cart lines.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// `GET /products/{id}`.
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, RemoteError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, Product>,
    failing: HashSet<ProductId>,
    lookups: Vec<ProductId>,
    latency: Option<Duration>,
}

/// In-memory product catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryProductCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub fn insert(&self, product: Product) {
        self.state
            .write()
            .unwrap()
            .products
            .insert(product.id.clone(), product);
    }

    /// Makes lookups of the given product fail.
    pub fn set_failing(&self, product_id: impl Into<ProductId>, fail: bool) {
        let mut state = self.state.write().unwrap();
        let product_id = product_id.into();
        if fail {
            state.failing.insert(product_id);
        } else {
            state.failing.remove(&product_id);
        }
    }

    /// Delays every lookup, to exercise concurrent fan-out.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().unwrap().latency = latency;
    }

    /// Returns the product ids looked up so far, in call order.
    pub fn lookups(&self) -> Vec<ProductId> {
        self.state.read().unwrap().lookups.clone()
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, RemoteError> {
        let latency = {
            let mut state = self.state.write().unwrap();
            state.lookups.push(product_id.clone());
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.read().unwrap();
        if state.failing.contains(product_id) {
            return Err(RemoteError::Unavailable(format!(
                "Lookup of {product_id} failed"
            )));
        }

        state
            .products
            .get(product_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("Product {product_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use domain::Money;

    use super::*;

    fn product(id: &str) -> Product {
        let mut p = Product::placeholder(ProductId::new(id));
        p.title = "Hostel kettle".to_string();
        p.price = Money::from_rupees(600);
        p.stock = 1;
        p
    }

    #[tokio::test]
    async fn test_lookup_known_product() {
        let catalog = InMemoryProductCatalog::new();
        catalog.insert(product("p1"));

        let found = catalog.get_product(&ProductId::new("p1")).await.unwrap();
        assert_eq!(found.title, "Hostel kettle");
        assert_eq!(catalog.lookups(), vec![ProductId::new("p1")]);
    }

    #[tokio::test]
    async fn test_lookup_unknown_product_is_not_found() {
        let catalog = InMemoryProductCatalog::new();
        let result = catalog.get_product(&ProductId::new("nope")).await;
        assert!(matches!(result, Err(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failing_lookup() {
        let catalog = InMemoryProductCatalog::new();
        catalog.insert(product("p1"));
        catalog.set_failing("p1", true);

        assert!(catalog.get_product(&ProductId::new("p1")).await.is_err());

        catalog.set_failing("p1", false);
        assert!(catalog.get_product(&ProductId::new("p1")).await.is_ok());
    }
}
