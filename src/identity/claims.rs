use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};
use super::role::Role;

pub const CLAIM_TENANT_ID: &str = "tenantId";
pub const CLAIM_SUBJECT_ID: &str = "subjectId";
pub const CLAIM_ROLE: &str = "role";
pub const CLAIM_EMAIL: &str = "email";

/// Validated identity claims for one request. Immutable once extracted.
///
/// tenantId and subjectId are hard requirements: extraction fails closed before
/// any network call when either is absent. A missing or unrecognised role falls
/// back to Finance — the least-privilege portal role — rather than failing; the
/// fallback is logged at warn so a misconfigured authenticator stays visible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityClaims {
    pub tenant_id: String,
    pub subject_id: String,
    pub role: Role,
    pub email: String,
}

impl IdentityClaims {
    pub fn from_claim_bag(bag: &HashMap<String, String>) -> AppResult<Self> {
        let tenant_id = required(bag, CLAIM_TENANT_ID)?;
        let subject_id = required(bag, CLAIM_SUBJECT_ID)?;

        let role = match bag.get(CLAIM_ROLE).map(|s| s.as_str()) {
            Some(raw) => match Role::parse(raw) {
                Some(r) => r,
                None => {
                    warn!(
                        target: "identity",
                        "unrecognised role claim '{}' for subject={}; defaulting to Finance",
                        raw, subject_id
                    );
                    Role::Finance
                }
            },
            None => {
                warn!(
                    target: "identity",
                    "role claim absent for subject={}; defaulting to Finance",
                    subject_id
                );
                Role::Finance
            }
        };

        let email = bag.get(CLAIM_EMAIL).cloned().unwrap_or_default();

        Ok(IdentityClaims { tenant_id, subject_id, role, email })
    }
}

fn required(bag: &HashMap<String, String>, key: &str) -> AppResult<String> {
    match bag.get(key) {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(AppError::missing_claim(format!("required claim '{}' absent", key))),
    }
}
