//! Integration tests for the cart engine over in-memory collaborators.

use std::sync::Arc;

use common::{ProductId, UserId};
use domain::{Money, Product};
use engine::{
    CartEngine, EngineError, FetchFailurePolicy, Level, RecordingNotifier, Session,
    SessionManager,
};
use remote::{InMemoryAuthService, InMemoryCartService, InMemoryProductCatalog, Role, User};

type TestEngine = CartEngine<InMemoryCartService, InMemoryProductCatalog, RecordingNotifier>;

struct Harness {
    engine: TestEngine,
    service: InMemoryCartService,
    catalog: InMemoryProductCatalog,
    notifier: RecordingNotifier,
}

fn product(id: &str, rupees: i64, stock: u32) -> Product {
    let mut p = Product::placeholder(ProductId::new(id));
    p.title = format!("Listing {id}");
    p.price = Money::from_rupees(rupees);
    p.stock = stock;
    p.category = "electronics".to_string();
    p
}

fn signed_in_session() -> Arc<Session> {
    let session = Arc::new(Session::new());
    let manager = SessionManager::new(InMemoryAuthService::new(), session.clone());
    manager.login(
        User {
            id: UserId::new("USER-0001"),
            name: "Asha".to_string(),
            email: "asha@iitb.ac.in".to_string(),
            role: Role::User,
            verified: true,
        },
        Some("token-1".to_string()),
    );
    session
}

fn setup_with(session: Arc<Session>, policy: FetchFailurePolicy) -> Harness {
    let service = InMemoryCartService::new();
    let catalog = InMemoryProductCatalog::new();
    let notifier = RecordingNotifier::new();
    for p in [product("pA", 100, 10), product("pB", 250, 3), product("pC", 40, 20)] {
        service.stock_product(p.clone());
        catalog.insert(p);
    }

    let engine = CartEngine::new(service.clone(), catalog.clone(), notifier.clone(), session)
        .with_fetch_failure_policy(policy);
    Harness {
        engine,
        service,
        catalog,
        notifier,
    }
}

fn setup() -> Harness {
    setup_with(signed_in_session(), FetchFailurePolicy::KeepLastKnown)
}

fn pid(id: &str) -> ProductId {
    ProductId::new(id)
}

/// Signed-in harness holding `{pA: qty 2 @ ₹100}` with product detail.
async fn setup_with_line_a() -> Harness {
    let h = setup();
    assert!(h.engine.add_item(&pid("pA"), 2).await);
    h
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_add_while_signed_out_creates_nothing() {
    let h = setup_with(Arc::new(Session::new()), FetchFailurePolicy::KeepLastKnown);

    assert!(!h.engine.add_item(&pid("pA"), 1).await);

    assert!(h.engine.cart().await.is_none());
    assert_eq!(h.service.request_count(), 0);
    let seen = h.notifier.notifications();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].title, "Please sign in");
    assert_eq!(seen[0].description, "You need to be logged in to add items to cart");

    let err = h.engine.try_add_item(&pid("pA"), 1).await.unwrap_err();
    assert!(matches!(err, EngineError::AuthRequired));
}

#[tokio::test]
async fn test_update_keeps_product_detail_from_before_the_call() {
    let h = setup_with_line_a().await;
    let before = h.engine.cart().await.unwrap();
    assert!(before.lines()[0].product.is_some());

    assert!(h.engine.update_item(&pid("pA"), 5).await);

    let cart = h.engine.cart().await.unwrap();
    let line = cart.line(&pid("pA")).unwrap();
    assert_eq!(line.quantity, 5);
    assert_eq!(line.product, before.lines()[0].product);
    assert_eq!(cart.total(), Money::from_rupees(500));
    assert_eq!(h.service.quantity_of(&pid("pA")), Some(5));
}

#[tokio::test]
async fn test_update_response_without_prices_keeps_prior_price() {
    let h = setup_with_line_a().await;
    h.service.set_omit_prices(true);

    assert!(h.engine.update_item(&pid("pA"), 5).await);

    let cart = h.engine.cart().await.unwrap();
    let line = cart.line(&pid("pA")).unwrap();
    assert_eq!(line.quantity, 5);
    assert_eq!(line.price, Some(Money::from_rupees(100)));
    assert_eq!(cart.total(), Money::from_rupees(500));
    assert!(cart.totals_consistent());
}

#[tokio::test]
async fn test_fetch_prices_bare_lines_from_looked_up_products() {
    let h = setup();
    h.service.set_embed_on_get(false);
    h.service.set_omit_prices(true);
    h.service.seed_line("pA", 2, Money::from_rupees(100));
    h.service.seed_line("pC", 3, Money::from_rupees(40));

    assert!(h.engine.fetch().await);

    let cart = h.engine.cart().await.unwrap();
    assert!(cart.fully_priced());
    assert_eq!(cart.line(&pid("pC")).unwrap().price, Some(Money::from_rupees(40)));
    assert_eq!(cart.total(), Money::from_rupees(320));
    assert!(cart.totals_consistent());
}

#[tokio::test]
async fn test_add_that_would_overflow_quantity_is_rejected_locally() {
    let h = setup_with_line_a().await;
    let before = h.engine.cart().await.unwrap();
    let requests = h.service.request_count();

    let err = h
        .engine
        .try_add_item(&pid("pA"), u32::MAX)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Cart(domain::CartError::QuantityOverflow { held: 2, .. })
    ));
    assert_eq!(h.service.request_count(), requests);
    assert_eq!(h.engine.cart().await.unwrap(), before);
    assert_eq!(h.service.quantity_of(&pid("pA")), Some(2));
}

#[tokio::test]
async fn test_failed_update_restores_cart() {
    let h = setup_with_line_a().await;
    let before = h.engine.cart().await.unwrap();
    h.service.set_fail_on_update(true);

    assert!(!h.engine.update_item(&pid("pA"), 5).await);

    let cart = h.engine.cart().await.unwrap();
    assert_eq!(cart, before);
    assert_eq!(cart.line(&pid("pA")).unwrap().quantity, 2);
    assert_eq!(cart.total(), Money::from_rupees(200));
    assert_eq!(h.notifier.titles().last().unwrap(), "Error");
}

#[tokio::test]
async fn test_clear_empties_three_line_cart() {
    let h = setup();
    assert!(h.engine.add_item(&pid("pA"), 1).await);
    assert!(h.engine.add_item(&pid("pB"), 1).await);
    assert!(h.engine.add_item(&pid("pC"), 2).await);
    assert_eq!(h.engine.cart().await.unwrap().lines().len(), 3);

    assert!(h.engine.clear_cart().await);

    let cart = h.engine.cart().await.unwrap();
    assert!(cart.lines().is_empty());
    assert_eq!(cart.total(), Money::zero());
    assert_eq!(cart.item_count(), 0);
    assert_eq!(h.service.line_count(), 0);
    assert_eq!(h.notifier.titles().last().unwrap(), "Cart cleared");
}

// ============================================================================
// Rollback
// ============================================================================

#[tokio::test]
async fn test_failed_remove_restores_cart() {
    let h = setup_with_line_a().await;
    assert!(h.engine.add_item(&pid("pB"), 1).await);
    let before = h.engine.cart().await.unwrap();
    h.service.set_fail_on_remove(true);

    assert!(!h.engine.remove_item(&pid("pB")).await);

    assert_eq!(h.engine.cart().await.unwrap(), before);
    assert_eq!(h.service.line_count(), 2);
}

#[tokio::test]
async fn test_failed_clear_restores_cart() {
    let h = setup_with_line_a().await;
    let before = h.engine.cart().await.unwrap();
    h.service.set_fail_on_clear(true);

    assert!(!h.engine.clear_cart().await);

    assert_eq!(h.engine.cart().await.unwrap(), before);
}

#[tokio::test]
async fn test_failed_add_leaves_state_unchanged() {
    let h = setup_with_line_a().await;
    let before = h.engine.cart().await.unwrap();
    h.service.set_fail_on_add(true);

    assert!(!h.engine.add_item(&pid("pC"), 1).await);

    assert_eq!(h.engine.cart().await.unwrap(), before);
}

// ============================================================================
// Add, update, remove
// ============================================================================

#[tokio::test]
async fn test_add_refetches_enriched_cart() {
    let h = setup();

    assert!(h.engine.add_item(&pid("pA"), 2).await);

    let cart = h.engine.cart().await.unwrap();
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(cart.item_count(), 2);
    assert!(cart.lines()[0].is_enriched());
    assert!(cart.totals_consistent());
    assert_eq!(h.notifier.titles(), vec!["Added to cart"]);
}

#[tokio::test]
async fn test_add_succeeds_even_if_refetch_fails() {
    let h = setup();
    h.service.set_fail_on_get(true);

    assert!(h.engine.add_item(&pid("pA"), 1).await);

    assert_eq!(h.service.quantity_of(&pid("pA")), Some(1));
    let titles = h.notifier.titles();
    assert_eq!(titles, vec!["Error", "Added to cart"]);
}

#[tokio::test]
async fn test_add_unknown_product_fails() {
    let h = setup();

    assert!(!h.engine.add_item(&pid("missing"), 1).await);
    assert!(h.engine.cart().await.is_none());
}

#[tokio::test]
async fn test_add_beyond_known_stock_is_rejected_locally() {
    let h = setup();
    assert!(h.engine.add_item(&pid("pB"), 2).await);
    let requests = h.service.request_count();

    let err = h.engine.try_add_item(&pid("pB"), 2).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Cart(domain::CartError::ExceedsStock {
            requested: 4,
            available: 3,
            ..
        })
    ));
    assert_eq!(h.service.request_count(), requests);
}

#[tokio::test]
async fn test_update_beyond_stock_is_rejected_locally() {
    let h = setup();
    assert!(h.engine.add_item(&pid("pB"), 1).await);
    let before = h.engine.cart().await.unwrap();
    let requests = h.service.request_count();

    assert!(!h.engine.update_item(&pid("pB"), 4).await);

    assert_eq!(h.engine.cart().await.unwrap(), before);
    assert_eq!(h.service.request_count(), requests);
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let h = setup_with_line_a().await;
    assert!(h.engine.add_item(&pid("pC"), 1).await);

    assert!(h.engine.update_item(&pid("pA"), 0).await);

    let cart = h.engine.cart().await.unwrap();
    assert!(cart.line(&pid("pA")).is_none());
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(h.service.quantity_of(&pid("pA")), None);
    assert_eq!(h.notifier.titles().last().unwrap(), "Item removed");
}

#[tokio::test]
async fn test_remove_keeps_other_lines_enriched() {
    let h = setup_with_line_a().await;
    assert!(h.engine.add_item(&pid("pB"), 1).await);

    assert!(h.engine.remove_item(&pid("pA")).await);

    let cart = h.engine.cart().await.unwrap();
    assert_eq!(cart.lines().len(), 1);
    assert!(cart.line(&pid("pB")).unwrap().is_enriched());
    assert_eq!(cart.total(), Money::from_rupees(250));
}

#[tokio::test]
async fn test_mutations_without_cart_make_no_request() {
    let h = setup();

    assert!(!h.engine.remove_item(&pid("pA")).await);
    assert!(!h.engine.clear_cart().await);
    assert!(matches!(
        h.engine.try_update_item(&pid("pA"), 2).await,
        Err(EngineError::NoCart)
    ));
    assert_eq!(h.service.request_count(), 0);
}

#[tokio::test]
async fn test_server_total_is_adopted() {
    let h = setup_with_line_a().await;
    h.service.set_total_override(Some(Money::from_rupees(450)));

    assert!(h.engine.update_item(&pid("pA"), 5).await);

    let cart = h.engine.cart().await.unwrap();
    assert_eq!(cart.total(), Money::from_rupees(450));
    assert_eq!(cart.item_count(), 5);
}

// ============================================================================
// Fetch
// ============================================================================

#[tokio::test]
async fn test_fetch_enriches_bare_lines() {
    let h = setup();
    h.service.set_embed_on_get(false);
    h.service.seed_line("pA", 1, Money::from_rupees(100));
    h.service.seed_line("pB", 2, Money::from_rupees(250));

    assert!(h.engine.fetch().await);

    let cart = h.engine.cart().await.unwrap();
    assert!(cart.lines().iter().all(|l| l.is_enriched()));
    assert_eq!(h.catalog.lookups().len(), 2);
    assert_eq!(cart.total(), Money::from_rupees(600));
    assert!(!h.engine.is_loading().await);
}

#[tokio::test]
async fn test_fetch_falls_back_to_placeholder() {
    let h = setup();
    h.service.set_embed_on_get(false);
    h.service.seed_line("pA", 1, Money::from_rupees(100));
    h.service.seed_line("pB", 1, Money::from_rupees(250));
    h.catalog.set_failing("pB", true);

    assert!(h.engine.fetch().await);

    let cart = h.engine.cart().await.unwrap();
    assert!(!cart.line(&pid("pA")).unwrap().product.as_ref().unwrap().is_placeholder());
    let fallback = cart.line(&pid("pB")).unwrap().product.as_ref().unwrap();
    assert!(fallback.is_placeholder());
    assert_eq!(fallback.stock, 0);
    assert_eq!(fallback.price, Money::zero());
}

#[tokio::test]
async fn test_fetch_is_idempotent() {
    let h = setup_with_line_a().await;
    assert!(h.engine.add_item(&pid("pC"), 3).await);

    assert!(h.engine.fetch().await);
    let first = h.engine.cart().await.unwrap();
    assert!(h.engine.fetch().await);
    let second = h.engine.cart().await.unwrap();

    assert_eq!(first.lines(), second.lines());
    assert_eq!(first.total(), second.total());
    assert_eq!(first.item_count(), second.item_count());
}

#[tokio::test]
async fn test_fetch_before_any_add_has_no_cart() {
    let h = setup();
    assert!(h.engine.fetch().await);
    assert!(h.engine.cart().await.is_none());
}

#[tokio::test]
async fn test_fetch_failure_keeps_last_known_cart() {
    let h = setup_with_line_a().await;
    let before = h.engine.cart().await.unwrap();
    h.service.set_fail_on_get(true);

    assert!(!h.engine.fetch().await);

    assert_eq!(h.engine.cart().await.unwrap(), before);
    assert!(!h.engine.is_loading().await);
    let last = h.notifier.notifications().pop().unwrap();
    assert_eq!(last.level, Level::Error);
}

#[tokio::test]
async fn test_fetch_failure_clears_cart_under_clear_policy() {
    let h = setup_with(signed_in_session(), FetchFailurePolicy::Clear);
    assert!(h.engine.add_item(&pid("pA"), 1).await);
    h.service.set_fail_on_get(true);

    assert!(!h.engine.fetch().await);

    assert!(h.engine.cart().await.is_none());
}

// ============================================================================
// Totals and ordering
// ============================================================================

#[tokio::test]
async fn test_totals_hold_after_every_mutation() {
    let h = setup();
    assert!(h.engine.add_item(&pid("pA"), 1).await);
    assert!(h.engine.cart().await.unwrap().totals_consistent());
    assert!(h.engine.add_item(&pid("pB"), 2).await);
    assert!(h.engine.cart().await.unwrap().totals_consistent());
    assert!(h.engine.update_item(&pid("pA"), 4).await);
    assert!(h.engine.cart().await.unwrap().totals_consistent());
    assert!(h.engine.remove_item(&pid("pB")).await);
    assert!(h.engine.cart().await.unwrap().totals_consistent());
    assert!(h.engine.clear_cart().await);
    assert!(h.engine.cart().await.unwrap().totals_consistent());
}

#[tokio::test]
async fn test_concurrent_updates_apply_in_order() {
    let h = setup_with_line_a().await;
    let a = pid("pA");

    let (first, second, third) = tokio::join!(
        h.engine.update_item(&a, 3),
        h.engine.update_item(&a, 7),
        h.engine.update_item(&a, 4),
    );

    assert!(first && second && third);
    assert_eq!(h.service.quantity_of(&pid("pA")), Some(4));
    assert_eq!(h.engine.cart().await.unwrap().line(&pid("pA")).unwrap().quantity, 4);
}

#[tokio::test]
async fn test_summary_reflects_shipping_threshold() {
    let h = setup_with_line_a().await;

    let summary = h.engine.summary().await.unwrap();
    assert_eq!(summary.subtotal, Money::from_rupees(200));
    assert_eq!(summary.shipping, Money::from_rupees(50));
    assert_eq!(summary.total, Money::from_rupees(250));

    assert!(h.engine.update_item(&pid("pA"), 6).await);
    let summary = h.engine.summary().await.unwrap();
    assert!(summary.ships_free());
    assert_eq!(summary.total, Money::from_rupees(600));
}

#[tokio::test]
async fn test_cart_serializes_for_presentation() {
    let h = setup_with_line_a().await;

    let json = serde_json::to_value(h.engine.cart().await.unwrap()).unwrap();

    assert_eq!(json["itemCount"], 2);
    assert_eq!(json["total"], 200);
    assert_eq!(json["items"][0]["productId"], "pA");
    assert_eq!(json["items"][0]["product"]["title"], "Listing pA");
}
