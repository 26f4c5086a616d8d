//! The `Store` trait — the single contract every other component uses to
//! reach the Persistent Store. Concrete implementation lives in
//! `mcpfusion-storage`; this crate only defines the seam so `mcpfusion-auth`,
//! `mcpfusion-server` and tests can depend on an interface rather than a
//! concrete database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mcpfusion_core::domain::{
    ApiTokenMetadata, AuthCodeData, KnowledgeEntry, OAuthTokenData, ServiceCredentials,
    TenantInfo, TenantResourceCount, UserMetadata,
};
use std::collections::HashMap;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the Persistent Store.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("tenant not found")]
    TenantNotFound,
    #[error("token not found")]
    TokenNotFound,
    #[error("service not found: {0}")]
    ServiceNotFound(String),
    #[error("user not found")]
    UserNotFound,
    #[error("user already exists")]
    UserExists,
    #[error("API key already linked to another user")]
    KeyAlreadyLinked,
    #[error("knowledge entry not found")]
    KnowledgeNotFound,
    #[error("auth code not found or expired")]
    AuthCodeNotFound,
    #[error("database is closed")]
    DatabaseClosed,
    #[error("ambiguous token prefix")]
    AmbiguousPrefix,
    #[error("schema version mismatch: database has {found}, expected {expected}")]
    SchemaMismatch { found: String, expected: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("database error during {op}: {wrapped}")]
    Database {
        op: String,
        tenant: Option<String>,
        service: Option<String>,
        wrapped: String,
    },
}

impl StoreError {
    /// Convenience predicate mirroring `IsNotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::TenantNotFound
                | StoreError::TokenNotFound
                | StoreError::ServiceNotFound(_)
                | StoreError::UserNotFound
                | StoreError::KnowledgeNotFound
                | StoreError::AuthCodeNotFound
        )
    }

    pub fn database(op: impl Into<String>, wrapped: impl std::fmt::Display) -> Self {
        StoreError::Database {
            op: op.into(),
            tenant: None,
            service: None,
            wrapped: wrapped.to_string(),
        }
    }
}

/// A listing row for `ListAPITokens`.
#[derive(Debug, Clone)]
pub struct ApiTokenListing {
    pub hash: String,
    pub prefix: String,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub description: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    // -- API tokens --------------------------------------------------------
    async fn add_api_token(&self, description: &str) -> StoreResult<(String, String)>;
    async fn validate_api_token(&self, plaintext: &str) -> StoreResult<String>;
    async fn delete_api_token(&self, hash: &str) -> StoreResult<()>;
    async fn list_api_tokens(&self) -> StoreResult<Vec<ApiTokenListing>>;
    async fn get_api_token_metadata(&self, hash: &str) -> StoreResult<ApiTokenMetadata>;
    async fn resolve_api_token(&self, prefix_or_hash: &str) -> StoreResult<String>;

    // -- Tenants -------------------------------------------------------------
    async fn get_tenant_info(&self, hash: &str) -> StoreResult<TenantInfo>;
    async fn list_tenants(&self) -> StoreResult<Vec<(String, TenantInfo)>>;
    async fn update_tenant_metadata(&self, hash: &str, info: TenantInfo) -> StoreResult<()>;
    async fn update_tenant_last_used(&self, hash: &str);
    async fn delete_tenant(&self, hash: &str) -> StoreResult<()>;
    async fn tenant_exists(&self, hash: &str) -> StoreResult<bool>;
    async fn get_tenant_resource_count(&self, hash: &str) -> StoreResult<TenantResourceCount>;

    // -- OAuth tokens ----------------------------------------------------
    async fn store_oauth_token(
        &self,
        tenant: &str,
        service: &str,
        data: OAuthTokenData,
    ) -> StoreResult<()>;
    async fn get_oauth_token(&self, tenant: &str, service: &str) -> StoreResult<OAuthTokenData>;
    async fn refresh_oauth_token(
        &self,
        tenant: &str,
        service: &str,
        new_access: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<OAuthTokenData>;
    async fn delete_oauth_token(&self, tenant: &str, service: &str) -> StoreResult<()>;
    async fn list_oauth_tokens(&self, tenant: &str) -> StoreResult<Vec<(String, OAuthTokenData)>>;

    // -- Service credentials ----------------------------------------------
    async fn store_credentials(
        &self,
        tenant: &str,
        service: &str,
        creds: ServiceCredentials,
    ) -> StoreResult<()>;
    async fn get_credentials(&self, tenant: &str, service: &str) -> StoreResult<ServiceCredentials>;
    async fn delete_credentials(&self, tenant: &str, service: &str) -> StoreResult<()>;
    async fn has_credentials(&self, tenant: &str, service: &str) -> StoreResult<bool>;

    // -- Users & linkage ---------------------------------------------------
    async fn create_user(&self, display_name: Option<String>) -> StoreResult<UserMetadata>;
    async fn get_user(&self, id: uuid::Uuid) -> StoreResult<UserMetadata>;
    async fn list_users(&self) -> StoreResult<Vec<UserMetadata>>;
    async fn delete_user(&self, id: uuid::Uuid) -> StoreResult<()>;
    async fn link_api_key(&self, user: uuid::Uuid, hash: &str) -> StoreResult<()>;
    async fn unlink_api_key(&self, hash: &str) -> StoreResult<()>;
    async fn get_user_by_api_key(&self, hash: &str) -> StoreResult<UserMetadata>;
    async fn auto_migrate_keys(&self) -> StoreResult<u64>;

    // -- Knowledge -----------------------------------------------------------
    async fn set_knowledge(
        &self,
        user: uuid::Uuid,
        domain: &str,
        key: &str,
        content: &str,
    ) -> StoreResult<KnowledgeEntry>;
    async fn get_knowledge(
        &self,
        user: uuid::Uuid,
        domain: &str,
        key: &str,
    ) -> StoreResult<KnowledgeEntry>;
    async fn list_knowledge(
        &self,
        user: uuid::Uuid,
        domain: Option<&str>,
    ) -> StoreResult<Vec<KnowledgeEntry>>;
    async fn delete_knowledge(&self, user: uuid::Uuid, domain: &str, key: &str) -> StoreResult<()>;
    async fn rename_knowledge(
        &self,
        user: uuid::Uuid,
        domain: &str,
        old_key: &str,
        new_key: &str,
    ) -> StoreResult<()>;
    async fn search_knowledge(
        &self,
        user: uuid::Uuid,
        query: &str,
    ) -> StoreResult<Vec<KnowledgeEntry>>;

    // -- Auth codes ------------------------------------------------------
    async fn create_auth_code(
        &self,
        tenant: &str,
        service: &str,
        ttl_seconds: i64,
    ) -> StoreResult<String>;
    async fn validate_auth_code(&self, code: &str) -> StoreResult<AuthCodeData>;
    async fn cleanup_expired_auth_codes(&self) -> StoreResult<u64>;

    // -- Admin -------------------------------------------------------------
    async fn backup(&self, path: &str) -> StoreResult<()>;
}

/// Placeholder used by in-memory fakes (tests, and the `HashMap`-backed
/// document shape of OAuth/credential payloads passed around).
pub type Payload = HashMap<String, String>;
