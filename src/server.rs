//!
//! dashgate HTTP server
//! --------------------
//! This module defines the Axum-based HTTP API for the embed gateway.
//!
//! Responsibilities:
//! - The `GET /dashboards/embed-url` endpoint: claims -> governance rules ->
//!   session context -> provider mint -> formatted JSON response.
//! - Translating the front door's forwarded identity headers into a claim bag.
//! - The stable error contract: `{"error": ..., "retryable": ...}` with the
//!   status mapping owned by `AppError`; rich diagnostics stay in the logs.
//! - A plain health endpoint for the hosting platform.
//!
//! Everything is request-scoped: the only shared resources are the governance
//! store's connection pool and the provider's HTTP client, both built once in
//! `run` and injected through `AppState`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::embed::{mint, EmbedProvider, HttpEmbedProvider, SessionContext, EMBED_SESSION_SECS};
use crate::error::AppError;
use crate::governance::{GovernanceError, GovernanceStore, PgPool, PostgresGovernanceStore};
use crate::identity::{IdentityClaims, CLAIM_EMAIL, CLAIM_ROLE, CLAIM_SUBJECT_ID, CLAIM_TENANT_ID};

/// Identity headers forwarded by the front door after authentication. Each maps
/// to the claim key the extractor validates.
const IDENTITY_HEADERS: [(&str, &str); 4] = [
    ("x-identity-tenant-id", CLAIM_TENANT_ID),
    ("x-identity-subject-id", CLAIM_SUBJECT_ID),
    ("x-identity-role", CLAIM_ROLE),
    ("x-identity-email", CLAIM_EMAIL),
];

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub governance: Arc<dyn GovernanceStore>,
    pub provider: Arc<dyn EmbedProvider>,
}

/// Build the claim bag from the forwarded identity headers. Non-UTF8 header
/// values are dropped; the validating extractor decides what is fatal.
fn claim_bag_from_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut bag = HashMap::new();
    for (header, claim) in IDENTITY_HEADERS {
        if let Some(v) = headers.get(header).and_then(|v| v.to_str().ok()) {
            bag.insert(claim.to_string(), v.to_string());
        }
    }
    bag
}

fn error_response(err: &AppError) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({"error": err.public_message(), "retryable": err.retryable()})),
    )
}

async fn embed_url_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    let request_id = Uuid::new_v4();

    // 1. Claims. Missing tenant/subject fails closed before any network call.
    let bag = claim_bag_from_headers(&headers);
    let claims = match IdentityClaims::from_claim_bag(&bag) {
        Ok(c) => c,
        Err(e) => {
            warn!(target: "embed", request_id = %request_id, "claim extraction failed: {}", e);
            return error_response(&e);
        }
    };

    // 2. Dashboard catalog lookup for the caller's role.
    let Some(dashboard_id) = state.config.dashboard_for(claims.role) else {
        let e = AppError::not_found(format!("no dashboard configured for role {}", claims.role));
        warn!(
            target: "embed",
            request_id = %request_id, tenant = %claims.tenant_id, subject = %claims.subject_id,
            "{}", e
        );
        return error_response(&e);
    };

    // 3. Governance rules (the retried network boundary).
    let rules = match state
        .governance
        .list_rules(&claims.tenant_id, &claims.subject_id)
        .await
    {
        Ok(rules) => rules,
        Err(ge) => {
            let e = match ge {
                GovernanceError::Transient(msg) => AppError::infra(msg),
                GovernanceError::Fatal(msg) => AppError::infra(msg),
            };
            error!(
                target: "embed",
                request_id = %request_id, tenant = %claims.tenant_id, subject = %claims.subject_id,
                "governance load failed: {}", e
            );
            return error_response(&e);
        }
    };

    // 4/5. Context build (pure) and provider mint.
    let ctx = SessionContext::build(&claims, &rules);
    match mint(state.provider.as_ref(), &ctx, dashboard_id).await {
        Ok(grant) => {
            let expires_at =
                chrono::Utc::now() + chrono::Duration::seconds(grant.expires_in_seconds as i64);
            info!(
                target: "embed",
                request_id = %request_id, tenant = %claims.tenant_id, subject = %claims.subject_id,
                role = %claims.role, rules = rules.len(),
                "embed grant minted (expires_at={})", expires_at.to_rfc3339()
            );
            (
                StatusCode::OK,
                Json(json!({"embedUrl": grant.url, "expiresIn": grant.expires_in_seconds})),
            )
        }
        Err(e) => {
            error!(
                target: "embed",
                request_id = %request_id, tenant = %claims.tenant_id, subject = %claims.subject_id,
                "mint failed: {}", e
            );
            error_response(&e)
        }
    }
}

async fn healthz() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Router over an explicit state, used by `run` and by integration tests that
/// inject mock stores/providers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/dashboards/embed-url", get(embed_url_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Start the dashgate HTTP server from environment configuration. Constructs
/// the connection pool and provider client once, serves until the listener
/// ends, then runs the pool teardown hook.
pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let pool = PgPool::new(&config.pg_dsn, config.pool_size);
    let governance = Arc::new(PostgresGovernanceStore::new(pool.clone()));
    let provider = Arc::new(HttpEmbedProvider::new(
        &config.provider_url,
        &config.provider_account_id,
    )?);

    info!(
        target: "dashgate",
        "configured: pool_size={}, dashboards={}, grant_lifetime={}s",
        config.pool_size,
        config.dashboards.len(),
        EMBED_SESSION_SECS
    );

    let http_port = config.http_port;
    let state = AppState {
        config: Arc::new(config),
        governance,
        provider,
    };
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    pool.close();
    Ok(())
}
