//! Bounded exponential backoff for the governance store's network call.
//! Only transient failures are retried; query-level failures surface at once.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::store::GovernanceError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(5000),
            multiplier: 2,
        }
    }
}

/// Run `op` up to `policy.max_retries + 1` times, sleeping between attempts.
/// `GovernanceError::Fatal` is returned immediately without further attempts.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, GovernanceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GovernanceError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(GovernanceError::Fatal(msg)) => return Err(GovernanceError::Fatal(msg)),
            Err(GovernanceError::Transient(msg)) => {
                if attempt >= policy.max_retries {
                    return Err(GovernanceError::Transient(msg));
                }
                attempt += 1;
                warn!(
                    target: "governance",
                    "transient store failure (attempt {}/{}), retrying in {:?}: {}",
                    attempt, policy.max_retries, delay, msg
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * policy.multiplier, policy.max_delay);
            }
        }
    }
}
