//! HTTP implementations of the remote collaborators.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, ProductId};
use domain::Product;
use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;

use crate::error::{RemoteError, Result};
use crate::services::{AuthService, CartService, Credentials, ProductCatalog, User};
use crate::wire::{self, CartSnapshot};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddItemBody<'a> {
    product_id: &'a ProductId,
    quantity: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateItemBody<'a> {
    cart_id: &'a CartId,
    product_id: &'a ProductId,
    quantity: u32,
}

/// Storefront backend client.
///
/// Keeps a cookie jar for the httpOnly session cookie and, once a token has
/// been applied, sends it as a bearer token on every request. One client
/// implements all three collaborator traits.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    api_root: Url,
    client: Client,
    bearer: Arc<RwLock<Option<String>>>,
}

impl HttpClient {
    /// Creates a client for the backend at `base_url` (e.g.
    /// `http://localhost:5000`). `timeout` bounds every request.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_root = Url::parse(&format!("{base_url}/api")).map_err(|e| RemoteError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        if api_root.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl {
                url: base_url,
                reason: "not a hierarchical URL".to_string(),
            });
        }

        Ok(Self {
            base_url,
            api_root,
            client,
            bearer: Arc::new(RwLock::new(None)),
        })
    }

    /// Returns the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Appends path segments to the API root, percent-encoding each one so an
    /// id containing `/`, `?` or `#` stays a single segment.
    fn segment_url(&self, segments: &[&str]) -> Url {
        let mut url = self.api_root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.bearer.read().unwrap().clone();
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Option<Value>> {
        let response = self.authorized(request).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        wire::check_response(status, &body)
    }

    async fn send_for_cart(&self, request: RequestBuilder) -> Result<Option<CartSnapshot>> {
        let data = self.send(request).await?;
        wire::normalize_cart(data, Utc::now())
    }
}

#[async_trait]
impl CartService for HttpClient {
    #[tracing::instrument(skip(self))]
    async fn get_cart(&self) -> Result<Option<CartSnapshot>> {
        self.send_for_cart(self.client.get(self.url("/cart"))).await
    }

    #[tracing::instrument(skip(self))]
    async fn add_item(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let body = AddItemBody {
            product_id,
            quantity,
        };
        self.send(self.client.post(self.url("/cart/add")).json(&body))
            .await
            .map(|_| ())
    }

    #[tracing::instrument(skip(self))]
    async fn update_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<CartSnapshot>> {
        let body = UpdateItemBody {
            cart_id,
            product_id,
            quantity,
        };
        self.send_for_cart(self.client.put(self.url("/cart/update")).json(&body))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn remove_item(&self, product_id: &ProductId) -> Result<Option<CartSnapshot>> {
        let url = self.segment_url(&["cart", "remove", product_id.as_str()]);
        self.send_for_cart(self.client.delete(url)).await
    }

    #[tracing::instrument(skip(self))]
    async fn clear(&self) -> Result<Option<CartSnapshot>> {
        self.send_for_cart(self.client.delete(self.url("/cart/clear")))
            .await
    }
}

#[async_trait]
impl ProductCatalog for HttpClient {
    #[tracing::instrument(skip(self))]
    async fn get_product(&self, product_id: &ProductId) -> Result<Product> {
        let url = self.segment_url(&["products", product_id.as_str()]);
        let data = self.send(self.client.get(url)).await?;
        wire::normalize_product(data)
    }
}

#[async_trait]
impl AuthService for HttpClient {
    #[tracing::instrument(skip(self, credentials))]
    async fn me(&self, credentials: &Credentials) -> Result<Option<User>> {
        let request = self.client.get(self.url("/auth/me"));
        let request = match credentials {
            Credentials::Cookie => request,
            Credentials::Bearer(token) => request.bearer_auth(token),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(RemoteError::Unauthorized { status });
        }
        if !response.status().is_success() {
            return Err(RemoteError::Status {
                status,
                message: format!("HTTP {status}"),
            });
        }

        let body: Value = response.json().await?;
        Ok(wire::normalize_user(&body))
    }

    #[tracing::instrument(skip(self))]
    async fn logout(&self) -> Result<()> {
        let request = self.client.post(self.url("/auth/logout")).json(&Value::Null);
        self.send(request).await.map(|_| ())
    }

    fn apply_token(&self, token: Option<&str>) {
        *self.bearer.write().unwrap() = token.map(str::to_string);
    }
}
