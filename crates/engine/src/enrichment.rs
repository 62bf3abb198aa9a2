//! Product enrichment of cart lines.

use std::collections::HashMap;

use domain::{Cart, Product};
use futures_util::future::join_all;
use remote::ProductCatalog;

/// Outcome of one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Distinct products resolved from the catalog.
    pub resolved: usize,
    /// Distinct products replaced by the placeholder.
    pub fallbacks: usize,
}

/// Attaches product detail to every line of `cart` that lacks it.
///
/// One lookup is issued per distinct product id, all concurrently. A failed
/// lookup puts `Product::placeholder` on that product's lines only; it never
/// fails the pass.
pub async fn enrich<P: ProductCatalog + ?Sized>(catalog: &P, cart: &mut Cart) -> EnrichmentReport {
    let ids = cart.unenriched_product_ids();
    if ids.is_empty() {
        return EnrichmentReport::default();
    }

    let lookups = ids.iter().map(|id| catalog.get_product(id));
    let results = join_all(lookups).await;

    let mut report = EnrichmentReport::default();
    let mut products = HashMap::with_capacity(ids.len());
    for (id, result) in ids.into_iter().zip(results) {
        let product = match result {
            Ok(product) => {
                report.resolved += 1;
                product
            }
            Err(e) => {
                tracing::warn!(product_id = %id, error = %e, "product lookup failed, using placeholder");
                metrics::counter!("cart_enrichment_fallbacks_total").increment(1);
                report.fallbacks += 1;
                Product::placeholder(id.clone())
            }
        };
        products.insert(id, product);
    }

    cart.attach_products(&products);
    tracing::debug!(resolved = report.resolved, fallbacks = report.fallbacks, "enriched cart");
    report
}
