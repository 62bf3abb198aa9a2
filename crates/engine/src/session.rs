//! Authentication session and its bootstrap.

use std::sync::{Arc, RwLock};

use remote::{AuthService, Credentials, RemoteError, User};

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    token: Option<String>,
    /// Last user seen by a successful check, kept across transient failures.
    cached_user: Option<User>,
}

/// The ambient authentication state the cart engine reads.
///
/// Shared between the `SessionManager` that writes it and any number of
/// engines that read it.
#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    /// Creates a signed-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signed-out session holding a previously persisted token.
    pub fn with_stored_token(token: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(SessionState {
                token: Some(token.into()),
                ..SessionState::default()
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().unwrap().user.is_some()
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().unwrap().user.clone()
    }

    /// Returns the bearer token to persist, if any.
    pub fn stored_token(&self) -> Option<String> {
        self.state.read().unwrap().token.clone()
    }

    fn sign_in(&self, user: User) {
        let mut state = self.state.write().unwrap();
        state.cached_user = Some(user.clone());
        state.user = Some(user);
    }

    fn sign_out(&self) {
        let mut state = self.state.write().unwrap();
        state.user = None;
        state.cached_user = None;
        state.token = None;
    }
}

/// How `SessionManager::bootstrap` resolved the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The session cookie identified the user.
    Cookie,
    /// The stored bearer token identified the user.
    Token,
    /// The check failed transiently; the cached user was kept.
    Cached,
    /// No valid session.
    SignedOut,
}

/// Resolves and maintains the session against the auth endpoints.
pub struct SessionManager<A: AuthService> {
    auth: A,
    session: Arc<Session>,
}

impl<A: AuthService> SessionManager<A> {
    pub fn new(auth: A, session: Arc<Session>) -> Self {
        Self { auth, session }
    }

    /// Returns the shared session.
    pub fn session(&self) -> Arc<Session> {
        self.session.clone()
    }

    /// Works out who is signed in.
    ///
    /// The cookie is tried first. If it does not resolve a user and a token
    /// is stored, the token is applied and tried next. A 401/403 on the token
    /// (or a token that resolves no user) discards it and signs out. Any
    /// other failure keeps the cached user when there is one.
    #[tracing::instrument(skip(self))]
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        match self.auth.me(&Credentials::Cookie).await {
            Ok(Some(user)) => {
                tracing::info!(user_id = %user.id, "session resolved from cookie");
                self.session.sign_in(user);
                return BootstrapOutcome::Cookie;
            }
            Ok(None) => tracing::debug!("cookie check returned no user"),
            Err(e) => tracing::debug!(error = %e, "cookie check failed"),
        }

        let Some(token) = self.session.stored_token() else {
            return self.keep_cached_or_sign_out();
        };

        self.auth.apply_token(Some(&token));
        match self.auth.me(&Credentials::Bearer(token)).await {
            Ok(Some(user)) => {
                tracing::info!(user_id = %user.id, "session resolved from token");
                self.session.sign_in(user);
                BootstrapOutcome::Token
            }
            Ok(None) => {
                tracing::info!("stored token resolved no user, discarding it");
                self.discard();
                BootstrapOutcome::SignedOut
            }
            Err(e) if e.is_auth_failure() => {
                tracing::info!(error = %e, "stored token rejected, discarding it");
                self.discard();
                BootstrapOutcome::SignedOut
            }
            Err(e) => {
                tracing::warn!(error = %e, "token check failed");
                self.keep_cached_or_sign_out()
            }
        }
    }

    /// Records a successful login. A returned token is persisted and applied.
    pub fn login(&self, user: User, token: Option<String>) {
        if let Some(token) = token {
            self.auth.apply_token(Some(&token));
            self.session.state.write().unwrap().token = Some(token);
        }
        self.session.sign_in(user);
    }

    /// Signs out locally. The server-side logout is best effort.
    pub async fn logout(&self) -> Result<(), RemoteError> {
        let result = self.auth.logout().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "server logout failed");
        }
        self.discard();
        result
    }

    fn discard(&self) {
        self.auth.apply_token(None);
        self.session.sign_out();
    }

    fn keep_cached_or_sign_out(&self) -> BootstrapOutcome {
        let mut state = self.session.state.write().unwrap();
        match state.cached_user.clone() {
            Some(user) => {
                state.user = Some(user);
                BootstrapOutcome::Cached
            }
            None => {
                state.user = None;
                BootstrapOutcome::SignedOut
            }
        }
    }
}
