//! Client-side cart synchronization.
//!
//! `CartEngine` keeps the signed-in user's cart in memory and mirrors every
//! change to the storefront backend:
//! - fetch replaces the cart wholesale and enriches lines lacking product
//!   detail with concurrent catalog lookups
//! - add is confirmed by the server first, then the cart is refetched
//! - update, remove and clear are optimistic and roll back on failure
//!
//! `SessionManager` resolves who is signed in; the engine only reads the
//! resulting `Session`.

pub mod config;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod notifier;
pub mod session;

pub use config::{EngineConfig, FetchFailurePolicy};
pub use engine::{CartEngine, CartState};
pub use enrichment::{EnrichmentReport, enrich};
pub use error::{EngineError, Result};
pub use notifier::{Level, Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use session::{BootstrapOutcome, Session, SessionManager};
