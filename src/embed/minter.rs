//! Turns a session context into a short-lived embed grant: one provider call,
//! visible parameters appended to the returned URL, and a regression guard that
//! the tenant id never reaches the URL's query string.

use serde::Serialize;
use tracing::error;

use crate::error::{AppError, AppResult};

use super::context::SessionContext;
use super::provider::{EmbedProvider, EmbedRequest};

/// Fixed grant lifetime. The browser re-requests shortly before expiry; the
/// grant itself is single-use and expires passively at the provider.
pub const EMBED_SESSION_SECS: u64 = 900;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmbedGrant {
    pub url: String,
    pub expires_in_seconds: u64,
}

/// Mint one grant. Secure tags travel through the provider's native tag
/// mechanism; visible params are appended to the returned URL as literal query
/// parameters. Not retried here — retry policy for the provider belongs to the
/// caller (see `provider` module).
pub async fn mint(
    provider: &dyn EmbedProvider,
    ctx: &SessionContext,
    dashboard_id: &str,
) -> AppResult<EmbedGrant> {
    let req = EmbedRequest {
        dashboard_id: dashboard_id.to_string(),
        session_tags: ctx.secure_tags().to_vec(),
        lifetime_seconds: EMBED_SESSION_SECS,
    };
    let raw = provider.generate_embed_url(&req).await?;

    let mut url = reqwest::Url::parse(&raw)
        .map_err(|e| AppError::provider_generic(format!("provider returned unparseable URL: {}", e)))?;
    {
        let mut qp = url.query_pairs_mut();
        for (k, v) in ctx.visible_params() {
            qp.append_pair(k, v);
        }
    }

    // Regression guard: even if context construction is correct, the tenant id
    // must never be observable on the URL. Fail loudly, never strip silently.
    if let Some(query) = url.query() {
        if query.contains(ctx.tenant_id()) {
            error!(
                target: "embed",
                "invariant violation: tenant id present in embed URL query string"
            );
            return Err(AppError::invariant("tenant id leaked into visible query string"));
        }
    }

    Ok(EmbedGrant { url: url.into(), expires_in_seconds: EMBED_SESSION_SECS })
}
