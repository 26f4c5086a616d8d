//! Shared domain models, error taxonomy, and validation primitives for
//! MCPFusion. Minimal dependencies — this crate defines the domain language
//! the rest of the workspace builds on.

pub mod domain;
pub mod error;
pub mod types;
pub mod validation;

pub use domain::{
    ApiTokenMetadata, AuthCodeData, CredentialKind, KnowledgeEntry, OAuthTokenData,
    ServiceCredentials, TenantInfo, TenantResourceCount, UserMetadata,
};
pub use error::{sanitize_hash, CoreError, Result};
pub use types::HttpMethod;
