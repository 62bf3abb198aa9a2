//! Session resolution and the auth endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use common::UserId;
use remote::User;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// The signed-in user, resolved from `Authorization: Bearer {token}` or the
/// session cookie. A token is the user's id.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or(ApiError::Unauthorized)?;
        state
            .store
            .user(&UserId::new(token))
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// GET /api/auth/me: the signed-in user.
#[tracing::instrument(skip_all)]
pub async fn me(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "success": true, "data": { "user": user } }))
}

/// POST /api/auth/logout: expires the session cookie.
#[tracing::instrument(skip_all)]
pub async fn logout() -> Response {
    let body = Json(json!({ "success": true, "message": "Logged out" }));
    let expired = HeaderValue::from_static("token=; Path=/; Max-Age=0; HttpOnly");
    ([(SET_COOKIE, expired)], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: axum::http::HeaderName, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(
            bearer_token(&headers(AUTHORIZATION, "Bearer user-asha")),
            Some("user-asha")
        );
        assert_eq!(bearer_token(&headers(AUTHORIZATION, "Basic abc")), None);
        assert_eq!(bearer_token(&headers(AUTHORIZATION, "Bearer ")), None);
    }

    #[test]
    fn test_cookie_token() {
        assert_eq!(
            cookie_token(&headers(COOKIE, "theme=dark; token=user-asha")),
            Some("user-asha")
        );
        assert_eq!(cookie_token(&headers(COOKIE, "theme=dark")), None);
    }
}
