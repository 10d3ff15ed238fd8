//! Unified application error model and mapping helpers.
//! This module provides a common error enum used by the HTTP frontend and the
//! governance/embed modules, along with the HTTP status and caller-facing body
//! mapping. Internal messages are rich (for logs); caller-facing messages are a
//! fixed, minimal set — the two are deliberately decoupled so diagnostics never
//! leak into response bodies.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// A required identity claim was absent; the request fails closed.
    MissingClaim { code: String, message: String },
    /// The visualization provider denied the request for auth/permission reasons.
    ProviderAuth { code: String, message: String },
    /// The visualization provider throttled the request.
    ProviderThrottled { code: String, message: String },
    /// The provider account's pricing tier does not support embedding.
    ProviderUnsupportedPlan { code: String, message: String },
    /// Any other provider-side rejection.
    ProviderGeneric { code: String, message: String },
    /// No dashboard is configured for the caller's role.
    NotFound { code: String, message: String },
    /// Transient infrastructure failure after the retry budget was exhausted.
    Infra { code: String, message: String },
    /// A construction invariant was violated; a defect, never recoverable.
    Invariant { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::MissingClaim { code, .. }
            | AppError::ProviderAuth { code, .. }
            | AppError::ProviderThrottled { code, .. }
            | AppError::ProviderUnsupportedPlan { code, .. }
            | AppError::ProviderGeneric { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Infra { code, .. }
            | AppError::Invariant { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::MissingClaim { message, .. }
            | AppError::ProviderAuth { message, .. }
            | AppError::ProviderThrottled { message, .. }
            | AppError::ProviderUnsupportedPlan { message, .. }
            | AppError::ProviderGeneric { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Infra { message, .. }
            | AppError::Invariant { message, .. } => message.as_str(),
        }
    }

    pub fn missing_claim<S: Into<String>>(msg: S) -> Self {
        AppError::MissingClaim { code: "missing_claim".into(), message: msg.into() }
    }
    pub fn provider_auth<S: Into<String>>(msg: S) -> Self {
        AppError::ProviderAuth { code: "provider_auth".into(), message: msg.into() }
    }
    pub fn provider_throttled<S: Into<String>>(msg: S) -> Self {
        AppError::ProviderThrottled { code: "provider_throttled".into(), message: msg.into() }
    }
    pub fn provider_unsupported_plan<S: Into<String>>(msg: S) -> Self {
        AppError::ProviderUnsupportedPlan { code: "provider_unsupported_plan".into(), message: msg.into() }
    }
    pub fn provider_generic<S: Into<String>>(msg: S) -> Self {
        AppError::ProviderGeneric { code: "provider_error".into(), message: msg.into() }
    }
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AppError::NotFound { code: "not_found".into(), message: msg.into() }
    }
    pub fn infra<S: Into<String>>(msg: S) -> Self {
        AppError::Infra { code: "infra_error".into(), message: msg.into() }
    }
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        AppError::Invariant { code: "invariant_violation".into(), message: msg.into() }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::MissingClaim { .. } => 403,
            AppError::ProviderAuth { .. } => 403,
            AppError::ProviderThrottled { .. } => 429,
            AppError::ProviderUnsupportedPlan { .. } => 503,
            AppError::ProviderGeneric { .. } => 500,
            AppError::NotFound { .. } => 404,
            AppError::Infra { .. } => 500,
            AppError::Invariant { .. } => 500,
        }
    }

    /// Whether the caller may usefully retry the same request.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            AppError::ProviderThrottled { .. }
                | AppError::ProviderGeneric { .. }
                | AppError::Infra { .. }
        )
    }

    /// Stable, minimal message for the response body. Internal detail stays in
    /// `message()` and the server-side logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::MissingClaim { .. } | AppError::ProviderAuth { .. } => "Access denied",
            AppError::ProviderThrottled { .. } => "Too many requests, please try again",
            AppError::ProviderUnsupportedPlan { .. } => "Embedding is not enabled for this deployment",
            AppError::ProviderGeneric { .. } => "Failed to generate embed URL",
            AppError::NotFound { .. } => "No dashboard is available for this role",
            AppError::Infra { .. } => "Failed to generate embed URL",
            AppError::Invariant { .. } => "Internal error",
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::missing_claim("no tenant").http_status(), 403);
        assert_eq!(AppError::provider_auth("denied").http_status(), 403);
        assert_eq!(AppError::provider_throttled("slow down").http_status(), 429);
        assert_eq!(AppError::provider_unsupported_plan("tier").http_status(), 503);
        assert_eq!(AppError::provider_generic("boom").http_status(), 500);
        assert_eq!(AppError::not_found("no dashboard").http_status(), 404);
        assert_eq!(AppError::infra("pg down").http_status(), 500);
        assert_eq!(AppError::invariant("tenant leak").http_status(), 500);
    }

    #[test]
    fn retryable_mapping() {
        assert!(AppError::provider_throttled("x").retryable());
        assert!(AppError::provider_generic("x").retryable());
        assert!(AppError::infra("x").retryable());
        assert!(!AppError::missing_claim("x").retryable());
        assert!(!AppError::provider_auth("x").retryable());
        assert!(!AppError::provider_unsupported_plan("x").retryable());
        assert!(!AppError::not_found("x").retryable());
        assert!(!AppError::invariant("x").retryable());
    }

    #[test]
    fn public_messages_are_stable_and_minimal() {
        // Internal detail must never surface through the public message.
        let err = AppError::infra("connection refused to 10.0.0.5:5432");
        assert_eq!(err.public_message(), "Failed to generate embed URL");
        assert!(!err.public_message().contains("10.0.0.5"));

        assert_eq!(AppError::provider_throttled("429 from provider").public_message(),
                   "Too many requests, please try again");
        assert_eq!(AppError::missing_claim("tenantId absent").public_message(), "Access denied");
    }
}
