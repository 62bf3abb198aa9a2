//! `cartctl`: drive the cart engine against a running backend.
//!
//! ```text
//! cartctl show
//! cartctl add <product-id> [quantity]
//! cartctl update <product-id> <quantity>
//! cartctl remove <product-id>
//! cartctl clear
//! ```
//!
//! The session token is read from `CART_TOKEN`.

use std::process::ExitCode;
use std::sync::Arc;

use common::ProductId;
use engine::{BootstrapOutcome, CartEngine, EngineConfig, Session, SessionManager};
use remote::HttpClient;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

enum Command {
    Show,
    Add(ProductId, u32),
    Update(ProductId, u32),
    Remove(ProductId),
    Clear,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let quantity = |raw: Option<&String>, default: Option<u32>| match (raw, default) {
        (Some(raw), _) => raw
            .parse::<u32>()
            .map_err(|_| format!("invalid quantity: {raw}")),
        (None, Some(default)) => Ok(default),
        (None, None) => Err("missing quantity".to_string()),
    };
    let product = |raw: Option<&String>| {
        raw.map(|id| ProductId::new(id.as_str()))
            .ok_or_else(|| "missing product id".to_string())
    };

    match args.first().map(String::as_str) {
        None | Some("show") => Ok(Command::Show),
        Some("add") => Ok(Command::Add(product(args.get(1))?, quantity(args.get(2), Some(1))?)),
        Some("update") => Ok(Command::Update(product(args.get(1))?, quantity(args.get(2), None)?)),
        Some("remove") => Ok(Command::Remove(product(args.get(1))?)),
        Some("clear") => Ok(Command::Clear),
        Some(other) => Err(format!("unknown command: {other}")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let config = EngineConfig::from_env();
    let session = Arc::new(match std::env::var("CART_TOKEN") {
        Ok(token) => Session::with_stored_token(token),
        Err(_) => Session::new(),
    });

    let client = match HttpClient::new(config.api_base_url.clone(), config.request_timeout) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };
    let outcome = SessionManager::new(client.clone(), session.clone())
        .bootstrap()
        .await;
    if outcome == BootstrapOutcome::SignedOut {
        tracing::warn!("not signed in, the cart will be empty");
    }

    let engine = CartEngine::over_http(client, &config, session);

    engine.fetch().await;
    let ok = match command {
        Command::Show => true,
        Command::Add(product_id, quantity) => engine.add_item(&product_id, quantity).await,
        Command::Update(product_id, quantity) => engine.update_item(&product_id, quantity).await,
        Command::Remove(product_id) => engine.remove_item(&product_id).await,
        Command::Clear => engine.clear_cart().await,
    };

    match engine.cart().await {
        Some(cart) => {
            for line in cart.lines() {
                let title = line
                    .product
                    .as_ref()
                    .map_or(line.product_id.as_str(), |p| p.title.as_str());
                println!("{:>3} x {title} @ {}", line.quantity, line.unit_price());
            }
            if let Some(summary) = engine.summary().await {
                println!(
                    "items: {}  subtotal: {}  shipping: {}  total: {}",
                    summary.item_count, summary.subtotal, summary.shipping, summary.total
                );
            }
        }
        None => println!("no cart"),
    }

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
