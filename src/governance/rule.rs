use serde::{Deserialize, Serialize};

/// One data-visibility constraint for a (tenant, user) pair: a named dimension
/// and the values the user may see along it. `allowed_values` order is the
/// stored order and is significant downstream — it must not be re-sorted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GovernanceRule {
    pub dimension: String,
    pub allowed_values: Vec<String>,
}

impl GovernanceRule {
    pub fn new<S: Into<String>>(dimension: S, allowed_values: Vec<String>) -> Self {
        Self { dimension: dimension.into(), allowed_values }
    }
}
