//! Auth service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Storefront role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Seller,
    Admin,
}

/// The authenticated user as returned by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub verified: bool,
}

/// How a `/auth/me` request authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Rely on the httpOnly session cookie only.
    Cookie,
    /// Send `Authorization: Bearer {token}`.
    Bearer(String),
}

/// Trait for the session endpoints of the backend.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolves the current user. `Ok(None)` means the backend answered but
    /// returned no usable user.
    async fn me(&self, credentials: &Credentials) -> Result<Option<User>, RemoteError>;

    /// Ends the server-side session (clears the cookie).
    async fn logout(&self) -> Result<(), RemoteError>;

    /// Attaches (or detaches) a bearer token to every later request.
    fn apply_token(&self, token: Option<&str>);
}

/// Failure modes the in-memory auth service can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthFailure {
    #[default]
    None,
    /// Answer 401.
    Unauthorized,
    /// Fail as if the network were down.
    Unavailable,
}

#[derive(Debug, Default)]
struct InMemoryAuthState {
    cookie_user: Option<User>,
    token_users: HashMap<String, User>,
    applied_token: Option<String>,
    cookie_failure: AuthFailure,
    token_failure: AuthFailure,
    me_calls: usize,
    logouts: usize,
}

/// In-memory auth service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthService {
    state: Arc<RwLock<InMemoryAuthState>>,
}

impl InMemoryAuthService {
    /// Creates a new in-memory auth service with no sessions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the user the session cookie resolves to.
    pub fn set_cookie_user(&self, user: Option<User>) {
        self.state.write().unwrap().cookie_user = user;
    }

    /// Registers a bearer token for a user.
    pub fn register_token(&self, token: impl Into<String>, user: User) {
        self.state
            .write()
            .unwrap()
            .token_users
            .insert(token.into(), user);
    }

    /// Configures how cookie-based `me` calls fail.
    pub fn set_cookie_failure(&self, failure: AuthFailure) {
        self.state.write().unwrap().cookie_failure = failure;
    }

    /// Configures how token-based `me` calls fail.
    pub fn set_token_failure(&self, failure: AuthFailure) {
        self.state.write().unwrap().token_failure = failure;
    }

    /// Returns the token currently applied to outgoing requests.
    pub fn applied_token(&self) -> Option<String> {
        self.state.read().unwrap().applied_token.clone()
    }

    /// Returns the number of `me` calls made.
    pub fn me_calls(&self) -> usize {
        self.state.read().unwrap().me_calls
    }

    /// Returns the number of logout calls made.
    pub fn logouts(&self) -> usize {
        self.state.read().unwrap().logouts
    }
}

fn simulate(failure: AuthFailure) -> Result<(), RemoteError> {
    match failure {
        AuthFailure::None => Ok(()),
        AuthFailure::Unauthorized => Err(RemoteError::Unauthorized { status: 401 }),
        AuthFailure::Unavailable => Err(RemoteError::Unavailable(
            "Auth service unreachable".to_string(),
        )),
    }
}

#[async_trait]
impl AuthService for InMemoryAuthService {
    async fn me(&self, credentials: &Credentials) -> Result<Option<User>, RemoteError> {
        let mut state = self.state.write().unwrap();
        state.me_calls += 1;

        match credentials {
            Credentials::Cookie => {
                simulate(state.cookie_failure)?;
                state
                    .cookie_user
                    .clone()
                    .map(Some)
                    .ok_or(RemoteError::Unauthorized { status: 401 })
            }
            Credentials::Bearer(token) => {
                simulate(state.token_failure)?;
                Ok(state.token_users.get(token).cloned())
            }
        }
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        let mut state = self.state.write().unwrap();
        state.logouts += 1;
        state.cookie_user = None;
        Ok(())
    }

    fn apply_token(&self, token: Option<&str>) {
        self.state.write().unwrap().applied_token = token.map(str::to_string);
    }
}
