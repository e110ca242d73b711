//! Backend client for the offer and mint mirrors
//!
//! Two JSON endpoints, each called once per listing:
//! - `POST /offer` with `{ tokenURIStr }`
//! - `POST /mint` with `{ tokenUri, tokenURIStr, tokenCreator }`

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::BackendError;

/// Body of `POST /offer`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferRecord {
    #[serde(rename = "tokenURIStr")]
    pub token_uri_str: String,
}

/// Body of `POST /mint`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MintRequest {
    /// `0x`-prefixed hex of the token URI
    #[serde(rename = "tokenUri")]
    pub token_uri_hex: String,
    #[serde(rename = "tokenURIStr")]
    pub token_uri_str: String,
    #[serde(rename = "tokenCreator")]
    pub token_creator: String,
}

/// Identifier assigned by the backend to a minted token
#[derive(Debug, Clone, PartialEq)]
pub struct MintedToken {
    pub token_id: String,
}

#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn persist_offer(&self, record: &OfferRecord) -> Result<(), BackendError>;

    async fn persist_mint(&self, request: &MintRequest) -> Result<MintedToken, BackendError>;
}

#[derive(Clone)]
pub struct HttpBackendClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<String, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST to backend");

        let response = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Backend rejected request");
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn persist_offer(&self, record: &OfferRecord) -> Result<(), BackendError> {
        self.post_json("/offer", record).await.map(|_| ())
    }

    async fn persist_mint(&self, request: &MintRequest) -> Result<MintedToken, BackendError> {
        let body = self.post_json("/mint", request).await?;
        parse_minted_token(&body)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(e.to_string())
    }
}

/// Extract the minted token id from a `/mint` response body.
///
/// Accepts `{"tokenId": ..}`, `{"token_id": ..}`, `{"id": ..}`, a bare JSON
/// number or string, or a plain-text body.
pub fn parse_minted_token(body: &str) -> Result<MintedToken, BackendError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(BackendError::InvalidResponse(
            "empty mint response".to_string(),
        ));
    }

    let token_id = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["tokenId", "token_id", "id"]
            .iter()
            .find_map(|key| map.get(*key).and_then(scalar_to_string)),
        Ok(value) => scalar_to_string(&value),
        Err(_) => Some(trimmed.to_string()),
    };

    token_id
        .filter(|id| !id.is_empty())
        .map(|token_id| MintedToken { token_id })
        .ok_or_else(|| {
            BackendError::InvalidResponse(format!("no token id in mint response: {}", trimmed))
        })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
