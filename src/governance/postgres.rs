//! tokio-postgres implementation of the governance rule store, with a small
//! bounded connection pool shared across requests. The pool is constructed
//! explicitly at startup and injected through `AppState`; there is no
//! module-level client handle. Rules are returned in `rule_seq` order, which is
//! the store's insertion order — the ordered-sequence contract of
//! `GovernanceStore` is carried by the SQL, not by accident.

use std::ops::Deref;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

use async_trait::async_trait;

use super::retry::{with_retry, RetryPolicy};
use super::rule::GovernanceRule;
use super::store::{GovernanceError, GovernanceStore};

const LIST_RULES_SQL: &str = "SELECT dimension, allowed_values \
     FROM governance_rules \
     WHERE tenant_id = $1 AND subject_id = $2 \
     ORDER BY rule_seq";

struct PoolInner {
    dsn: String,
    idle: Mutex<Vec<Client>>,
    permits: Arc<Semaphore>,
}

/// Bounded pool of tokio-postgres clients. Acquiring may block briefly when all
/// permits are taken; that wait is a resource limit, not backpressure signaling.
#[derive(Clone)]
pub struct PgPool {
    inner: Arc<PoolInner>,
}

impl PgPool {
    pub fn new(dsn: &str, size: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                dsn: dsn.to_string(),
                idle: Mutex::new(Vec::with_capacity(size)),
                permits: Arc::new(Semaphore::new(size)),
            }),
        }
    }

    pub async fn acquire(&self) -> Result<PooledClient, GovernanceError> {
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|e| GovernanceError::Transient(format!("pool closed: {}", e)))?;

        // Reuse an idle client when one is available and still healthy.
        loop {
            let candidate = self.inner.idle.lock().unwrap_or_else(|p| p.into_inner()).pop();
            match candidate {
                Some(c) if !c.is_closed() => {
                    return Ok(PooledClient {
                        client: Some(c),
                        inner: Arc::clone(&self.inner),
                        _permit: permit,
                        broken: false,
                    });
                }
                Some(_) => continue, // stale connection, discard and look again
                None => break,
            }
        }

        let (client, connection) = tokio_postgres::connect(&self.inner.dsn, NoTls)
            .await
            .map_err(|e| GovernanceError::Transient(format!("connect failed: {}", e)))?;
        // Drive the connection on its own task for the client's lifetime.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(target: "governance", "postgres connection terminated: {}", e);
            }
        });
        Ok(PooledClient {
            client: Some(client),
            inner: Arc::clone(&self.inner),
            _permit: permit,
            broken: false,
        })
    }

    /// Teardown hook for the hosting process: drop all idle connections.
    /// In-flight clients close when their guards drop.
    pub fn close(&self) {
        let drained = {
            let mut idle = self.inner.idle.lock().unwrap_or_else(|p| p.into_inner());
            std::mem::take(&mut *idle)
        };
        info!(target: "governance", "pg pool closed, dropped {} idle connections", drained.len());
    }
}

/// RAII guard for a pooled client. Healthy clients return to the pool on drop;
/// clients marked broken are discarded so the next acquire reconnects.
pub struct PooledClient {
    client: Option<Client>,
    inner: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
    broken: bool,
}

impl PooledClient {
    fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl Deref for PooledClient {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().expect("client present until drop")
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        if let Some(c) = self.client.take() {
            if !self.broken && !c.is_closed() {
                self.inner.idle.lock().unwrap_or_else(|p| p.into_inner()).push(c);
            }
        }
    }
}

pub struct PostgresGovernanceStore {
    pool: PgPool,
    policy: RetryPolicy,
}

impl PostgresGovernanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, policy: RetryPolicy::default() }
    }

    pub fn with_policy(pool: PgPool, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    async fn query_rules(
        &self,
        tenant_id: &str,
        subject_id: &str,
    ) -> Result<Vec<GovernanceRule>, GovernanceError> {
        let mut client = self.pool.acquire().await?;
        let rows = match client.query(LIST_RULES_SQL, &[&tenant_id, &subject_id]).await {
            Ok(rows) => rows,
            Err(e) => {
                if e.as_db_error().is_none() {
                    // io/protocol failure: connection is suspect, do not reuse
                    client.mark_broken();
                    return Err(GovernanceError::Transient(e.to_string()));
                }
                return Err(GovernanceError::Fatal(e.to_string()));
            }
        };
        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let dimension: String = row
                .try_get("dimension")
                .map_err(|e| GovernanceError::Fatal(e.to_string()))?;
            let allowed_values: Vec<String> = row
                .try_get("allowed_values")
                .map_err(|e| GovernanceError::Fatal(e.to_string()))?;
            rules.push(GovernanceRule { dimension, allowed_values });
        }
        Ok(rules)
    }
}

#[async_trait]
impl GovernanceStore for PostgresGovernanceStore {
    async fn list_rules(
        &self,
        tenant_id: &str,
        subject_id: &str,
    ) -> Result<Vec<GovernanceRule>, GovernanceError> {
        with_retry(self.policy, || self.query_rules(tenant_id, subject_id)).await
    }
}
