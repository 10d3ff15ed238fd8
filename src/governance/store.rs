use async_trait::async_trait;
use thiserror::Error;

use super::rule::GovernanceRule;

#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Connectivity hiccup; safe to retry within the caller's budget.
    #[error("transient governance store failure: {0}")]
    Transient(String),
    /// Query-level failure; retrying will not help.
    #[error("governance store failure: {0}")]
    Fatal(String),
}

/// Read side of the governance rule store.
///
/// Contract: the returned list is an ordered sequence in the store's insertion
/// order, not a set. Downstream RLS configuration may depend on evaluation
/// order for overlapping rules, so implementations must not re-sort. An empty
/// list means "no restriction beyond tenant isolation" and is not an error.
/// `list_rules` is read-only and idempotent; it is safe to retry.
#[async_trait]
pub trait GovernanceStore: Send + Sync {
    async fn list_rules(
        &self,
        tenant_id: &str,
        subject_id: &str,
    ) -> Result<Vec<GovernanceRule>, GovernanceError>;
}
