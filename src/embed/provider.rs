//! Client for the visualization provider's embed API. One outbound call per
//! request, never retried here: throttled or auth-denied calls are surfaced to
//! the caller, who owns backoff against the shared provider quota.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Permission or account configuration problem. Not retryable.
    #[error("provider denied access: {0}")]
    AuthDenied(String),
    /// Quota exhausted at the provider. Retryable by the caller.
    #[error("provider throttled the request: {0}")]
    Throttled(String),
    /// The account's pricing tier does not include embedding. Deployment
    /// misconfiguration, not retryable.
    #[error("provider plan does not support embedding: {0}")]
    UnsupportedPlan(String),
    /// Anything else, including transport failures. Retryable by the caller.
    #[error("provider error: {0}")]
    Generic(String),
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::AuthDenied(msg) => AppError::provider_auth(msg),
            ProviderError::Throttled(msg) => AppError::provider_throttled(msg),
            ProviderError::UnsupportedPlan(msg) => AppError::provider_unsupported_plan(msg),
            ProviderError::Generic(msg) => AppError::provider_generic(msg),
        }
    }
}

/// One embed-URL generation request. `session_tags` is the full ordered secure
/// tag list; it travels in the request body, never on the URL.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    pub dashboard_id: String,
    pub session_tags: Vec<(String, String)>,
    pub lifetime_seconds: u64,
}

#[async_trait]
pub trait EmbedProvider: Send + Sync {
    async fn generate_embed_url(&self, req: &EmbedRequest) -> Result<String, ProviderError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTag<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    session_tags: Vec<WireTag<'a>>,
    session_lifetime_in_seconds: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    embed_url: Option<String>,
}

/// HTTP implementation of `EmbedProvider`. The reqwest client is constructed
/// once at startup and shared; reqwest pools connections internally.
pub struct HttpEmbedProvider {
    client: reqwest::Client,
    base: reqwest::Url,
    account_id: String,
}

impl HttpEmbedProvider {
    pub fn new(base_url: &str, account_id: &str) -> anyhow::Result<Self> {
        let base = reqwest::Url::parse(base_url)?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, base, account_id: account_id.to_string() })
    }
}

#[async_trait]
impl EmbedProvider for HttpEmbedProvider {
    async fn generate_embed_url(&self, req: &EmbedRequest) -> Result<String, ProviderError> {
        let path = format!(
            "accounts/{}/dashboards/{}/embed-url",
            urlencoding::encode(&self.account_id),
            urlencoding::encode(&req.dashboard_id)
        );
        let url = self
            .base
            .join(&path)
            .map_err(|e| ProviderError::Generic(format!("bad embed endpoint: {}", e)))?;

        let body = WireRequest {
            session_tags: req
                .session_tags
                .iter()
                .map(|(k, v)| WireTag { key: k, value: v })
                .collect(),
            session_lifetime_in_seconds: req.lifetime_seconds,
        };

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Generic(format!("embed call failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthDenied(format!("HTTP {}", status)),
                429 => ProviderError::Throttled(format!("HTTP {}", status)),
                402 => ProviderError::UnsupportedPlan(format!("HTTP {}", status)),
                _ => ProviderError::Generic(format!("HTTP {}: {}", status, detail)),
            });
        }

        let parsed: WireResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Generic(format!("unparseable embed response: {}", e)))?;
        parsed
            .embed_url
            .ok_or_else(|| ProviderError::Generic("embed response missing embedUrl".into()))
    }
}
