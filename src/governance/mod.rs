//! Governance rule store: per-user data-visibility constraints, scoped to
//! (tenant, subject). Read-only from this service's perspective; rules are
//! authored through an external management surface.

mod rule;
mod store;
pub mod retry;
mod postgres;

pub use rule::GovernanceRule;
pub use store::{GovernanceStore, GovernanceError};
pub use postgres::{PgPool, PostgresGovernanceStore};
