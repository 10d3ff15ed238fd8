//! End-to-end flows over the HTTP surface with mock governance store and
//! provider: the success scenarios, the full error contract, and the
//! no-network-on-input-error property.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use dashgate::config::Config;
use dashgate::embed::{EmbedProvider, EmbedRequest, ProviderError};
use dashgate::governance::{GovernanceError, GovernanceRule, GovernanceStore};
use dashgate::identity::Role;
use dashgate::server::{router, AppState};

struct MockStore {
    rules: Result<Vec<GovernanceRule>, &'static str>,
    calls: AtomicUsize,
}

impl MockStore {
    fn with_rules(rules: Vec<GovernanceRule>) -> Arc<Self> {
        Arc::new(Self { rules: Ok(rules), calls: AtomicUsize::new(0) })
    }
    fn failing(msg: &'static str) -> Arc<Self> {
        Arc::new(Self { rules: Err(msg), calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl GovernanceStore for MockStore {
    async fn list_rules(
        &self,
        _tenant_id: &str,
        _subject_id: &str,
    ) -> Result<Vec<GovernanceRule>, GovernanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.rules {
            Ok(rules) => Ok(rules.clone()),
            Err(msg) => Err(GovernanceError::Transient(msg.to_string())),
        }
    }
}

enum ProviderBehaviour {
    Url(&'static str),
    Fail(fn() -> ProviderError),
}

struct MockProvider {
    behaviour: ProviderBehaviour,
    calls: AtomicUsize,
    seen_tags: Mutex<Vec<(String, String)>>,
}

impl MockProvider {
    fn ok(url: &'static str) -> Arc<Self> {
        Arc::new(Self {
            behaviour: ProviderBehaviour::Url(url),
            calls: AtomicUsize::new(0),
            seen_tags: Mutex::new(Vec::new()),
        })
    }
    fn failing(f: fn() -> ProviderError) -> Arc<Self> {
        Arc::new(Self {
            behaviour: ProviderBehaviour::Fail(f),
            calls: AtomicUsize::new(0),
            seen_tags: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl EmbedProvider for MockProvider {
    async fn generate_embed_url(&self, req: &EmbedRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_tags.lock().unwrap() = req.session_tags.clone();
        match &self.behaviour {
            ProviderBehaviour::Url(u) => Ok(u.to_string()),
            ProviderBehaviour::Fail(f) => Err(f()),
        }
    }
}

fn test_config() -> Config {
    let mut dashboards = HashMap::new();
    dashboards.insert(Role::Admin, "db-admin".to_string());
    dashboards.insert(Role::Finance, "db-finance".to_string());
    dashboards.insert(Role::Marketing, "db-marketing".to_string());
    // Operations intentionally unmapped: exercises the 404 path.
    Config {
        http_port: 0,
        pg_dsn: "host=unused".into(),
        pool_size: 2,
        provider_url: "https://provider.invalid".into(),
        provider_account_id: "acct-test".into(),
        dashboards,
    }
}

async fn serve(store: Arc<MockStore>, provider: Arc<MockProvider>) -> SocketAddr {
    let state = AppState {
        config: Arc::new(test_config()),
        governance: store,
        provider,
    };
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn get_embed_url(
    addr: SocketAddr,
    headers: &[(&str, &str)],
) -> (u16, Value) {
    let client = reqwest::Client::new();
    let mut req = client.get(format!("http://{}/dashboards/embed-url", addr));
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    let resp = req.send().await.unwrap();
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn finance_user_with_no_rules_gets_grant() {
    let store = MockStore::with_rules(vec![]);
    let provider = MockProvider::ok("https://viz.example/embed/abc?tok=opaque");
    let addr = serve(store.clone(), provider.clone()).await;

    let (status, body) = get_embed_url(
        addr,
        &[
            ("x-identity-tenant-id", "T001"),
            ("x-identity-subject-id", "U1"),
            ("x-identity-role", "Finance"),
        ],
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["expiresIn"], 900);
    let url = body["embedUrl"].as_str().unwrap();
    dashgate::tprintln!("granted url: {}", url);
    assert!(url.contains("userRole=Finance"));
    let query = url.split('?').nth(1).unwrap();
    assert!(!query.contains("T001"));

    // Exact tag surface for the ungoverned case, tenant first.
    let tags = provider.seen_tags.lock().unwrap().clone();
    assert_eq!(
        tags,
        vec![
            ("tenant_id".to_string(), "T001".to_string()),
            ("store_id".to_string(), String::new()),
            ("region".to_string(), String::new()),
        ]
    );
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn marketing_user_with_region_rule_gets_governed_tags() {
    let store = MockStore::with_rules(vec![GovernanceRule::new(
        "region",
        vec!["North".into(), "South".into()],
    )]);
    let provider = MockProvider::ok("https://viz.example/embed/def");
    let addr = serve(store, provider.clone()).await;

    let (status, body) = get_embed_url(
        addr,
        &[
            ("x-identity-tenant-id", "T001"),
            ("x-identity-subject-id", "U2"),
            ("x-identity-role", "Marketing"),
        ],
    )
    .await;

    assert_eq!(status, 200);
    assert!(body["embedUrl"].as_str().unwrap().contains("userRole=Marketing"));
    let tags = provider.seen_tags.lock().unwrap().clone();
    assert_eq!(
        tags,
        vec![
            ("tenant_id".to_string(), "T001".to_string()),
            ("region".to_string(), "North,South".to_string()),
            ("store_id".to_string(), String::new()),
        ]
    );
}

#[tokio::test]
async fn missing_tenant_claim_fails_before_any_network_call() {
    let store = MockStore::with_rules(vec![]);
    let provider = MockProvider::ok("https://viz.example/embed/abc");
    let addr = serve(store.clone(), provider.clone()).await;

    let (status, body) = get_embed_url(
        addr,
        &[("x-identity-subject-id", "U1"), ("x-identity-role", "Finance")],
    )
    .await;

    assert_eq!(status, 403);
    assert_eq!(body["error"], "Access denied");
    assert_eq!(body["retryable"], false);
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_subject_claim_fails_before_any_network_call() {
    let store = MockStore::with_rules(vec![]);
    let provider = MockProvider::ok("https://viz.example/embed/abc");
    let addr = serve(store.clone(), provider.clone()).await;

    let (status, _body) = get_embed_url(addr, &[("x-identity-tenant-id", "T001")]).await;

    assert_eq!(status, 403);
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_role_defaults_to_finance_dashboard() {
    let store = MockStore::with_rules(vec![]);
    let provider = MockProvider::ok("https://viz.example/embed/abc");
    let addr = serve(store, provider.clone()).await;

    let (status, body) = get_embed_url(
        addr,
        &[("x-identity-tenant-id", "T001"), ("x-identity-subject-id", "U1")],
    )
    .await;

    assert_eq!(status, 200);
    assert!(body["embedUrl"].as_str().unwrap().contains("userRole=Finance"));
}

#[tokio::test]
async fn role_without_dashboard_maps_to_404() {
    let store = MockStore::with_rules(vec![]);
    let provider = MockProvider::ok("https://viz.example/embed/abc");
    let addr = serve(store.clone(), provider.clone()).await;

    let (status, body) = get_embed_url(
        addr,
        &[
            ("x-identity-tenant-id", "T001"),
            ("x-identity-subject-id", "U1"),
            ("x-identity-role", "Operations"),
        ],
    )
    .await;

    assert_eq!(status, 404);
    assert_eq!(body["error"], "No dashboard is available for this role");
    assert_eq!(body["retryable"], false);
    // Catalog miss is decided before the rule load.
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn provider_throttling_maps_to_429_retryable() {
    let store = MockStore::with_rules(vec![]);
    let provider = MockProvider::failing(|| ProviderError::Throttled("HTTP 429".into()));
    let addr = serve(store, provider).await;

    let (status, body) = get_embed_url(
        addr,
        &[
            ("x-identity-tenant-id", "T001"),
            ("x-identity-subject-id", "U1"),
            ("x-identity-role", "Admin"),
        ],
    )
    .await;

    assert_eq!(status, 429);
    assert_eq!(body["error"], "Too many requests, please try again");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn provider_auth_denial_maps_to_403_not_retryable() {
    let store = MockStore::with_rules(vec![]);
    let provider = MockProvider::failing(|| ProviderError::AuthDenied("HTTP 403".into()));
    let addr = serve(store, provider).await;

    let (status, body) = get_embed_url(
        addr,
        &[
            ("x-identity-tenant-id", "T001"),
            ("x-identity-subject-id", "U1"),
            ("x-identity-role", "Admin"),
        ],
    )
    .await;

    assert_eq!(status, 403);
    assert_eq!(body["error"], "Access denied");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn unsupported_plan_maps_to_503() {
    let store = MockStore::with_rules(vec![]);
    let provider = MockProvider::failing(|| ProviderError::UnsupportedPlan("HTTP 402".into()));
    let addr = serve(store, provider).await;

    let (status, body) = get_embed_url(
        addr,
        &[
            ("x-identity-tenant-id", "T001"),
            ("x-identity-subject-id", "U1"),
            ("x-identity-role", "Admin"),
        ],
    )
    .await;

    assert_eq!(status, 503);
    assert_eq!(body["error"], "Embedding is not enabled for this deployment");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn governance_outage_maps_to_retryable_500_with_minimal_body() {
    let store = MockStore::failing("connection refused to pg:5432");
    let provider = MockProvider::ok("https://viz.example/embed/abc");
    let addr = serve(store, provider.clone()).await;

    let (status, body) = get_embed_url(
        addr,
        &[
            ("x-identity-tenant-id", "T001"),
            ("x-identity-subject-id", "U1"),
            ("x-identity-role", "Finance"),
        ],
    )
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "Failed to generate embed URL");
    assert_eq!(body["retryable"], true);
    // Infra detail never reaches the body.
    assert!(!body["error"].as_str().unwrap().contains("pg:5432"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn healthz_is_unauthenticated_ok() {
    let store = MockStore::with_rules(vec![]);
    let provider = MockProvider::ok("https://viz.example/embed/abc");
    let addr = serve(store, provider).await;

    let resp = reqwest::get(format!("http://{}/healthz", addr)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
