//! Session context construction. This is the one place where identity claims
//! and governance rules meet: the output is the canonical, ordered set of RLS
//! filter tags plus the small set of URL-visible parameters. Construction is
//! pure and deterministic; the result is immutable once built.

use serde::Serialize;
use tracing::warn;

use crate::governance::GovernanceRule;
use crate::identity::IdentityClaims;

/// Tag key carrying tenant isolation. Always first in the secure tags and
/// never allowed into the visible parameters.
pub const TENANT_TAG: &str = "tenant_id";

/// Dimensions the provider-side RLS rules assume are always present. When no
/// governance rule covers one, it is emitted with an empty value ("no
/// restriction") so the provider rules never need null-handling branches.
pub const DEFAULT_DIMENSIONS: [&str; 2] = ["store_id", "region"];

/// Visible-parameter name for the caller's role. Role is deliberately
/// URL-observable for debugging; tenant and governance filters are not.
pub const ROLE_PARAM: &str = "userRole";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    tenant_id: String,
    secure_tags: Vec<(String, String)>,
    visible_params: Vec<(String, String)>,
}

impl SessionContext {
    /// Build the context for one request.
    ///
    /// Tag order is load-bearing: tenant_id first, then governance rules in
    /// loader order (never re-sorted — provider-side evaluation order for
    /// overlapping rules depends on it), then the uncovered default dimensions.
    /// Duplicate dimensions should not occur (store uniqueness invariant) but
    /// resolve deterministically last-one-wins if they do.
    pub fn build(claims: &IdentityClaims, rules: &[GovernanceRule]) -> Self {
        let mut secure_tags: Vec<(String, String)> =
            vec![(TENANT_TAG.to_string(), claims.tenant_id.clone())];

        for rule in rules {
            if rule.dimension == TENANT_TAG {
                // Tenant isolation comes from the claims, never from a rule row.
                warn!(
                    target: "embed",
                    "governance rule for reserved dimension '{}' ignored (tenant={})",
                    TENANT_TAG, claims.tenant_id
                );
                continue;
            }
            let joined = rule.allowed_values.join(",");
            match secure_tags.iter_mut().find(|(k, _)| *k == rule.dimension) {
                Some(existing) => existing.1 = joined,
                None => secure_tags.push((rule.dimension.clone(), joined)),
            }
        }

        for dim in DEFAULT_DIMENSIONS {
            if !secure_tags.iter().any(|(k, _)| k == dim) {
                secure_tags.push((dim.to_string(), String::new()));
            }
        }

        let visible_params = vec![(ROLE_PARAM.to_string(), claims.role.as_str().to_string())];

        SessionContext {
            tenant_id: claims.tenant_id.clone(),
            secure_tags,
            visible_params,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn secure_tags(&self) -> &[(String, String)] {
        &self.secure_tags
    }

    pub fn visible_params(&self) -> &[(String, String)] {
        &self.visible_params
    }
}
