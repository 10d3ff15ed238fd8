//! Identity handling for the embed gateway: the strongly-typed claim set and the
//! validating extraction from the front door's claim bag.
//! Keep the public surface thin and split implementation across sub-modules.

mod role;
mod claims;

pub use role::Role;
pub use claims::{IdentityClaims, CLAIM_TENANT_ID, CLAIM_SUBJECT_ID, CLAIM_ROLE, CLAIM_EMAIL};
