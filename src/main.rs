use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port = std::env::var("DASHGATE_HTTP_PORT").unwrap_or_else(|_| "7900".to_string());
    let pg_dsn_set = std::env::var("DASHGATE_PG_DSN").is_ok();
    let provider_url = std::env::var("DASHGATE_PROVIDER_URL").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "dashgate",
        "dashgate starting: RUST_LOG='{}', http_port={}, pg_dsn_configured={}, provider_url='{}'",
        rust_log, http_port, pg_dsn_set, provider_url
    );

    dashgate::server::run().await
}
