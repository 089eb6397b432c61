pub mod models;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::SessionStore;

/// JSON-over-HTTP transport to the gateway.
///
/// Attaches `Authorization: Bearer <token>` whenever a session is stored.
/// Transport only: no retries, no response caching. A per-request timeout is
/// configured so a dead gateway cannot hang a caller indefinitely.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn SessionStore>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: base_url.into(),
                store,
            }),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.inner.base_url, path);
        debug!(url = %url, "GET");

        let mut req = self.inner.http.get(&url);
        if let Some(session) = self.inner.store.current().await {
            req = req.bearer_auth(&session.token);
        }
        Self::handle(req.send().await?).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.inner.base_url, path);
        debug!(url = %url, "POST");

        let mut req = self.inner.http.post(&url).json(body);
        if let Some(session) = self.inner.store.current().await {
            req = req.bearer_auth(&session.token);
        }
        Self::handle(req.send().await?).await
    }

    /// POST where the response body is irrelevant (e.g. `201 Created`).
    pub async fn post_discard<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = format!("{}{}", self.inner.base_url, path);
        debug!(url = %url, "POST");

        let mut req = self.inner.http.post(&url).json(body);
        if let Some(session) = self.inner.store.current().await {
            req = req.bearer_auth(&session.token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Http {
            status: status.as_u16(),
            message: extract_message(&body),
        })
    }

    async fn handle<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(Error::Http {
            status: status.as_u16(),
            message: extract_message(&body),
        })
    }
}

/// Pull the human-readable error out of a gateway response body: the JSON
/// `message` field when the body is JSON, else the raw text.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_owned();
        }
    }
    body.to_owned()
}
