//! Environment-derived configuration, read once at startup.
//! All variables are prefixed DASHGATE_. The dashboard catalog maps each portal
//! role to the provider-side dashboard it is allowed to embed; a role without a
//! mapping gets a 404 from the embed endpoint.

use std::collections::HashMap;

use anyhow::Context;

use crate::identity::Role;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    /// tokio-postgres connection string for the governance rule store.
    pub pg_dsn: String,
    /// Bounded connection pool size shared across requests.
    pub pool_size: usize,
    /// Base URL of the visualization provider's embed API.
    pub provider_url: String,
    /// Provider account under which embed URLs are minted.
    pub provider_account_id: String,
    /// Role -> provider dashboard id.
    pub dashboards: HashMap<Role, String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let http_port: u16 = env_or("DASHGATE_HTTP_PORT", "7900")
            .parse()
            .context("DASHGATE_HTTP_PORT must be a port number")?;
        let pg_dsn = std::env::var("DASHGATE_PG_DSN")
            .context("DASHGATE_PG_DSN is required (governance rule store DSN)")?;
        let pool_size: usize = env_or("DASHGATE_PG_POOL_SIZE", "10")
            .parse()
            .context("DASHGATE_PG_POOL_SIZE must be an integer")?;
        let provider_url = std::env::var("DASHGATE_PROVIDER_URL")
            .context("DASHGATE_PROVIDER_URL is required (embed API base URL)")?;
        let provider_account_id = std::env::var("DASHGATE_PROVIDER_ACCOUNT_ID")
            .context("DASHGATE_PROVIDER_ACCOUNT_ID is required")?;

        let mut dashboards = HashMap::new();
        for role in Role::ALL {
            let key = format!("DASHGATE_DASHBOARD_{}", role.as_str().to_ascii_uppercase());
            if let Ok(id) = std::env::var(&key) {
                if !id.trim().is_empty() {
                    dashboards.insert(role, id);
                }
            }
        }

        Ok(Config {
            http_port,
            pg_dsn,
            pool_size,
            provider_url,
            provider_account_id,
            dashboards,
        })
    }

    /// Dashboard id for a role, if one is configured.
    pub fn dashboard_for(&self, role: Role) -> Option<&str> {
        self.dashboards.get(&role).map(|s| s.as_str())
    }
}
