//! Embed-grant pipeline: session context construction, the provider-facing
//! embed API client, and the minting step that turns a context into a
//! short-lived embed URL.

mod context;
mod provider;
mod minter;

pub use context::{SessionContext, DEFAULT_DIMENSIONS, TENANT_TAG, ROLE_PARAM};
pub use provider::{EmbedProvider, EmbedRequest, HttpEmbedProvider, ProviderError};
pub use minter::{mint, EmbedGrant, EMBED_SESSION_SECS};
