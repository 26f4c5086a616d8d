//! Domain records owned by the Persistent Store.
//!
//! These are plain data carriers; `mcpfusion-storage` is the only crate that
//! mutates them. Everything else receives them by value or by shared
//! reference through `mcpfusion-interfaces::Store`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata persisted for a minted API token. The plaintext token is never
/// stored — only its SHA-256 hash, which doubles as the tenant identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiTokenMetadata {
    /// 64 lower-hex SHA-256 of the plaintext token.
    pub hash: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

impl ApiTokenMetadata {
    /// First 8 hex characters of the hash, used for disambiguation in listings.
    pub fn prefix(&self) -> &str {
        &self.hash[..8.min(self.hash.len())]
    }
}

/// Per-tenant metadata. The tenant identifier itself (the token hash) is the
/// map key under which this record is stored, not a field here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TenantInfo {
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

/// An OAuth2 token held on behalf of one tenant for one service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthTokenData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthTokenData {
    /// A token is stale once `expires_at` has passed. Callers apply their own
    /// refresh buffer on top of this strict check.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }
}

/// Tag discriminating the shape of [`ServiceCredentials::payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    ApiKey,
    Bearer,
    Basic,
    Custom,
}

/// Non-OAuth credentials stored per (tenant, service).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceCredentials {
    pub kind: CredentialKind,
    pub payload: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stable user identity that may own zero or more API token hashes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserMetadata {
    pub id: uuid::Uuid,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single key/value entry in a user's knowledge store, partitioned by domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub domain: String,
    pub key: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A short-lived single-use coupon handing an OAuth authorization flow off to
/// an external helper ("Auth-code handoff").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthCodeData {
    pub tenant_hash: String,
    pub service: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthCodeData {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Resource counts used by `GetTenantResourceCount`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TenantResourceCount {
    pub oauth_tokens: u64,
    pub service_credentials: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn token_prefix_is_first_eight_hex() {
        let meta = ApiTokenMetadata {
            hash: "a".repeat(64),
            description: "prod".into(),
            created_at: Utc::now(),
            last_used: None,
        };
        assert_eq!(meta.prefix(), "aaaaaaaa");
    }

    #[test]
    fn oauth_token_staleness() {
        let now = Utc::now();
        let fresh = OAuthTokenData {
            access_token: "tok".into(),
            refresh_token: None,
            token_type: "Bearer".into(),
            expires_at: Some(now + Duration::minutes(5)),
            scopes: vec![],
            created_at: now,
            updated_at: now,
        };
        assert!(!fresh.is_stale(now));

        let stale = OAuthTokenData {
            expires_at: Some(now - Duration::minutes(1)),
            ..fresh
        };
        assert!(stale.is_stale(now));
    }

    #[test]
    fn auth_code_expiry() {
        let now = Utc::now();
        let code = AuthCodeData {
            tenant_hash: "t".into(),
            service: "svc".into(),
            created_at: now,
            expires_at: now + Duration::minutes(15),
        };
        assert!(!code.is_expired(now));
        assert!(code.is_expired(now + Duration::minutes(16)));
    }
}
