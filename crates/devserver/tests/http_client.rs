//! End-to-end tests: the HTTP client and cart engine against a live dev server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use common::ProductId;
use domain::Money;
use engine::{BootstrapOutcome, CartEngine, EngineError, RecordingNotifier, Session, SessionManager};
use metrics_exporter_prometheus::PrometheusHandle;
use remote::{AuthService, CartService, Credentials, HttpClient, ProductCatalog, RemoteError};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn spawn_server() -> String {
    let state = devserver::create_default_state(true);
    let app = devserver::create_app(state, get_metrics_handle());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str) -> HttpClient {
    HttpClient::new(base_url, Duration::from_secs(5)).unwrap()
}

fn pid(id: &str) -> ProductId {
    ProductId::new(id)
}

type HttpEngine = CartEngine<HttpClient, HttpClient, RecordingNotifier>;

async fn signed_in_engine(base_url: &str) -> (HttpEngine, RecordingNotifier) {
    let client = client(base_url);
    let session = Arc::new(Session::with_stored_token("user-asha"));
    let outcome = SessionManager::new(client.clone(), session.clone())
        .bootstrap()
        .await;
    assert_eq!(outcome, BootstrapOutcome::Token);

    let notifier = RecordingNotifier::new();
    let engine = CartEngine::new(client.clone(), client, notifier.clone(), session);
    (engine, notifier)
}

#[tokio::test]
async fn test_me_over_http() {
    let base_url = spawn_server().await;
    let client = client(&base_url);

    let err = client.me(&Credentials::Cookie).await.unwrap_err();
    assert!(err.is_auth_failure());

    let user = client
        .me(&Credentials::Bearer("user-asha".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.name, "Asha Rao");
}

#[tokio::test]
async fn test_bootstrap_discards_unknown_token() {
    let base_url = spawn_server().await;
    let session = Arc::new(Session::with_stored_token("user-ghost"));
    let manager = SessionManager::new(client(&base_url), session.clone());

    assert_eq!(manager.bootstrap().await, BootstrapOutcome::SignedOut);
    assert!(session.stored_token().is_none());
}

#[tokio::test]
async fn test_bootstrap_keeps_session_when_server_is_down() {
    let base_url = spawn_server().await;
    let session = Arc::new(Session::with_stored_token("user-asha"));
    let manager = SessionManager::new(client(&base_url), session.clone());
    assert_eq!(manager.bootstrap().await, BootstrapOutcome::Token);

    let unreachable = SessionManager::new(client("http://127.0.0.1:1"), session.clone());
    assert_eq!(unreachable.bootstrap().await, BootstrapOutcome::Cached);
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_product_lookup_over_http() {
    let base_url = spawn_server().await;
    let client = client(&base_url);

    let product = client.get_product(&pid("prod-drafter")).await.unwrap();
    assert_eq!(product.price, Money::from_rupees(180));

    let err = client.get_product(&pid("prod-none")).await.unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)));

    let err = client
        .get_product(&pid("prod-drafter?view=full"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)));
}

#[tokio::test]
async fn test_unauthenticated_cart_request_is_rejected() {
    let base_url = spawn_server().await;
    let err = client(&base_url).get_cart().await.unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized { status: 401 }));
}

#[tokio::test]
async fn test_engine_round_trip() {
    let base_url = spawn_server().await;
    let (engine, notifier) = signed_in_engine(&base_url).await;

    assert!(engine.fetch().await);
    assert!(engine.cart().await.is_none());

    assert!(engine.add_item(&pid("prod-notes"), 2).await);
    assert!(engine.add_item(&pid("prod-labcoat"), 1).await);
    let cart = engine.cart().await.unwrap();
    assert_eq!(cart.item_count(), 3);
    assert_eq!(cart.total(), Money::from_rupees(370));
    assert!(cart.lines().iter().all(|l| l.is_enriched()));

    assert!(engine.update_item(&pid("prod-notes"), 5).await);
    let cart = engine.cart().await.unwrap();
    let notes = cart.line(&pid("prod-notes")).unwrap();
    assert_eq!(notes.quantity, 5);
    assert_eq!(
        notes.product.as_ref().unwrap().title,
        "Thermodynamics handwritten notes"
    );
    assert_eq!(cart.total(), Money::from_rupees(550));
    assert!(engine.summary().await.unwrap().ships_free());

    assert!(engine.remove_item(&pid("prod-labcoat")).await);
    assert_eq!(engine.cart().await.unwrap().lines().len(), 1);

    assert!(engine.clear_cart().await);
    let cart = engine.cart().await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.total(), Money::zero());

    assert_eq!(
        notifier.titles(),
        vec!["Added to cart", "Added to cart", "Item removed", "Cart cleared"]
    );
}

#[tokio::test]
async fn test_engine_rolls_back_when_server_rejects() {
    let base_url = spawn_server().await;
    let (engine, notifier) = signed_in_engine(&base_url).await;
    assert!(engine.add_item(&pid("prod-drafter"), 1).await);
    let before = engine.cart().await.unwrap();

    // Another device empties the cart behind the engine's back.
    let other = client(&base_url);
    other.apply_token(Some("user-asha"));
    other.clear().await.unwrap();

    assert!(!engine.update_item(&pid("prod-drafter"), 3).await);

    assert_eq!(engine.cart().await.unwrap(), before);
    assert_eq!(notifier.titles().last().unwrap(), "Error");
}

#[tokio::test]
async fn test_server_stock_limit_surfaces_as_failure() {
    let base_url = spawn_server().await;
    let (engine, _) = signed_in_engine(&base_url).await;

    assert!(!engine.add_item(&pid("prod-calculator"), 3).await);
    assert!(engine.cart().await.is_none());

    let err = engine
        .try_add_item(&pid("prod-cycle"), 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Remote(RemoteError::Status { status: 400, .. })
    ));
}
