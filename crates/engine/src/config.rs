//! Engine configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

/// What `fetch` does with the in-memory cart when the request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchFailurePolicy {
    /// Keep the last successfully loaded cart.
    #[default]
    KeepLastKnown,
    /// Drop the cart, so the user sees an empty cart until the next fetch.
    Clear,
}

impl FromStr for FetchFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_last_known" => Ok(Self::KeepLastKnown),
            "clear" => Ok(Self::Clear),
            other => Err(format!("unknown fetch failure policy: {other}")),
        }
    }
}

/// Client configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `CART_API_BASE_URL`: backend origin (default: `"http://localhost:5000"`)
/// - `CART_REQUEST_TIMEOUT_SECS`: per-request timeout (default: `30`)
/// - `CART_FETCH_FAILURE_POLICY`: `keep` or `clear` (default: `keep`)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub fetch_failure_policy: FetchFailurePolicy,
}

impl EngineConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: std::env::var("CART_API_BASE_URL").unwrap_or(defaults.api_base_url),
            request_timeout: std::env::var("CART_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            fetch_failure_policy: std::env::var("CART_FETCH_FAILURE_POLICY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fetch_failure_policy),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            request_timeout: Duration::from_secs(30),
            fetch_failure_policy: FetchFailurePolicy::KeepLastKnown,
        }
    }
}
