//! `SqliteStore`: the sole implementation of `mcpfusion_interfaces::Store`.
//! Bucket schema maps onto tables one-for-one; nested buckets
//! (`tenants/{hash}/oauth_tokens/{service}`) become composite primary keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mcpfusion_core::domain::{
    ApiTokenMetadata, AuthCodeData, CredentialKind, KnowledgeEntry, OAuthTokenData,
    ServiceCredentials, TenantInfo, TenantResourceCount, UserMetadata,
};
use mcpfusion_core::validation::{is_valid_description, is_valid_hash, is_valid_service_name, is_valid_token};
use mcpfusion_interfaces::store::{ApiTokenListing, Store, StoreError, StoreResult};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::map_sqlx;

const SCHEMA_VERSION: &str = "1";

const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS api_tokens (
    hash TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_used TEXT
);
CREATE TABLE IF NOT EXISTS tenants (
    hash TEXT PRIMARY KEY,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT,
    last_used TEXT
);
CREATE TABLE IF NOT EXISTS oauth_tokens (
    tenant TEXT NOT NULL,
    service TEXT NOT NULL,
    access_token TEXT NOT NULL,
    refresh_token TEXT,
    token_type TEXT NOT NULL,
    expires_at TEXT,
    scopes TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (tenant, service)
);
CREATE TABLE IF NOT EXISTS service_credentials (
    tenant TEXT NOT NULL,
    service TEXT NOT NULL,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (tenant, service)
);
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    display_name TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS user_api_keys (
    hash TEXT PRIMARY KEY,
    user_id TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS knowledge (
    user_id TEXT NOT NULL,
    domain TEXT NOT NULL,
    key TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, domain, key)
);
CREATE TABLE IF NOT EXISTS auth_codes (
    code TEXT PRIMARY KEY,
    tenant_hash TEXT NOT NULL,
    service TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if absent) the database at `path`, runs the bucket
    /// schema migration, stamps the schema version, and runs
    /// `auto_migrate_keys` so pre-existing tokens gain user accounts.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::database("open", e))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx("connect", e))?;

        sqlx::query(MIGRATIONS)
            .execute(&pool)
            .await
            .map_err(|e| map_sqlx("migrate", e))?;

        let store = Self { pool };
        store.stamp_or_check_schema().await?;
        store.auto_migrate_keys().await?;
        Ok(store)
    }

    async fn stamp_or_check_schema(&self) -> StoreResult<()> {
        let existing: Option<String> = sqlx::query_scalar("SELECT value FROM schema_meta WHERE key = 'schema_version'")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("schema_check", e))?;
        match existing {
            None => {
                sqlx::query("INSERT INTO schema_meta (key, value) VALUES ('schema_version', ?)")
                    .bind(SCHEMA_VERSION)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx("schema_stamp", e))?;
                Ok(())
            }
            Some(found) if found == SCHEMA_VERSION => Ok(()),
            Some(found) => Err(StoreError::SchemaMismatch {
                found,
                expected: SCHEMA_VERSION.to_string(),
            }),
        }
    }
}

fn generate_hex_token(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn sha256_hex(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl Store for SqliteStore {
    // -- API tokens --------------------------------------------------------

    async fn add_api_token(&self, description: &str) -> StoreResult<(String, String)> {
        if !is_valid_description(description) {
            return Err(StoreError::Validation("description exceeds the 256 character limit".to_string()));
        }
        let plaintext = generate_hex_token(32);
        let hash = sha256_hex(&plaintext);
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx("add_api_token", e))?;
        sqlx::query("INSERT INTO api_tokens (hash, description, created_at, last_used) VALUES (?, ?, ?, NULL)")
            .bind(&hash)
            .bind(description)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("add_api_token", e))?;
        sqlx::query("INSERT INTO tenants (hash, description, created_at, last_used) VALUES (?, '', ?, NULL)")
            .bind(&hash)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("add_api_token", e))?;
        tx.commit().await.map_err(|e| map_sqlx("add_api_token", e))?;
        Ok((plaintext, hash))
    }

    async fn validate_api_token(&self, plaintext: &str) -> StoreResult<String> {
        if !is_valid_token(plaintext) {
            return Err(StoreError::Validation("malformed API token".to_string()));
        }
        let hash = sha256_hex(plaintext);
        let found: Option<String> = sqlx::query_scalar("SELECT hash FROM api_tokens WHERE hash = ?")
            .bind(&hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("validate_api_token", e))?;
        found.ok_or(StoreError::TokenNotFound)
    }

    async fn delete_api_token(&self, hash: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx("delete_api_token", e))?;
        let result = sqlx::query("DELETE FROM api_tokens WHERE hash = ?")
            .bind(hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_api_token", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::TokenNotFound);
        }
        sqlx::query("DELETE FROM tenants WHERE hash = ?")
            .bind(hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_api_token", e))?;
        sqlx::query("DELETE FROM oauth_tokens WHERE tenant = ?")
            .bind(hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_api_token", e))?;
        sqlx::query("DELETE FROM service_credentials WHERE tenant = ?")
            .bind(hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_api_token", e))?;
        sqlx::query("DELETE FROM user_api_keys WHERE hash = ?")
            .bind(hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_api_token", e))?;
        tx.commit().await.map_err(|e| map_sqlx("delete_api_token", e))?;
        Ok(())
    }

    async fn list_api_tokens(&self) -> StoreResult<Vec<ApiTokenListing>> {
        let rows = sqlx::query("SELECT hash, description, created_at, last_used FROM api_tokens ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx("list_api_tokens", e))?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let hash: String = row.get("hash");
                let created_at: String = row.get("created_at");
                let last_used: Option<String> = row.get("last_used");
                ApiTokenListing {
                    prefix: hash[..8.min(hash.len())].to_string(),
                    hash,
                    created_at: parse_ts(&created_at),
                    last_used: last_used.as_deref().map(parse_ts),
                    description: row.get("description"),
                }
            })
            .collect())
    }

    async fn get_api_token_metadata(&self, hash: &str) -> StoreResult<ApiTokenMetadata> {
        let row = sqlx::query("SELECT hash, description, created_at, last_used FROM api_tokens WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("get_api_token_metadata", e))?
            .ok_or(StoreError::TokenNotFound)?;
        let created_at: String = row.get("created_at");
        let last_used: Option<String> = row.get("last_used");
        Ok(ApiTokenMetadata {
            hash: row.get("hash"),
            description: row.get("description"),
            created_at: parse_ts(&created_at),
            last_used: last_used.as_deref().map(parse_ts),
        })
    }

    async fn resolve_api_token(&self, prefix_or_hash: &str) -> StoreResult<String> {
        if prefix_or_hash.len() == 64 {
            if !is_valid_hash(prefix_or_hash) {
                return Err(StoreError::Validation("malformed token hash".to_string()));
            }
            let exists: Option<String> = sqlx::query_scalar("SELECT hash FROM api_tokens WHERE hash = ?")
                .bind(prefix_or_hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx("resolve_api_token", e))?;
            return exists.ok_or(StoreError::TokenNotFound);
        }
        let pattern = format!("{prefix_or_hash}%");
        let matches: Vec<String> = sqlx::query_scalar("SELECT hash FROM api_tokens WHERE hash LIKE ?")
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx("resolve_api_token", e))?;
        match matches.len() {
            0 => Err(StoreError::TokenNotFound),
            1 => Ok(matches.into_iter().next().unwrap()),
            _ => Err(StoreError::AmbiguousPrefix),
        }
    }

    // -- Tenants -------------------------------------------------------------

    async fn get_tenant_info(&self, hash: &str) -> StoreResult<TenantInfo> {
        let row = sqlx::query("SELECT description, created_at, last_used FROM tenants WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("get_tenant_info", e))?
            .ok_or(StoreError::TenantNotFound)?;
        let created_at: Option<String> = row.get("created_at");
        let last_used: Option<String> = row.get("last_used");
        Ok(TenantInfo {
            description: row.get("description"),
            created_at: created_at.as_deref().map(parse_ts),
            last_used: last_used.as_deref().map(parse_ts),
        })
    }

    async fn list_tenants(&self) -> StoreResult<Vec<(String, TenantInfo)>> {
        let rows = sqlx::query("SELECT hash, description, created_at, last_used FROM tenants")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx("list_tenants", e))?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let created_at: Option<String> = row.get("created_at");
                let last_used: Option<String> = row.get("last_used");
                (
                    row.get("hash"),
                    TenantInfo {
                        description: row.get("description"),
                        created_at: created_at.as_deref().map(parse_ts),
                        last_used: last_used.as_deref().map(parse_ts),
                    },
                )
            })
            .collect())
    }

    async fn update_tenant_metadata(&self, hash: &str, info: TenantInfo) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE tenants SET description = ?, created_at = COALESCE(?, created_at), last_used = COALESCE(?, last_used) WHERE hash = ?",
        )
        .bind(&info.description)
        .bind(info.created_at.map(|d| d.to_rfc3339()))
        .bind(info.last_used.map(|d| d.to_rfc3339()))
        .bind(hash)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("update_tenant_metadata", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::TenantNotFound);
        }
        Ok(())
    }

    async fn update_tenant_last_used(&self, hash: &str) {
        let now = Utc::now().to_rfc3339();
        if let Err(err) = sqlx::query("UPDATE tenants SET last_used = ? WHERE hash = ?")
            .bind(&now)
            .bind(hash)
            .execute(&self.pool)
            .await
        {
            tracing::warn!(tenant = hash, error = %err, "failed to touch tenant last_used");
        }
    }

    async fn delete_tenant(&self, hash: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx("delete_tenant", e))?;
        let result = sqlx::query("DELETE FROM tenants WHERE hash = ?")
            .bind(hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_tenant", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::TenantNotFound);
        }
        sqlx::query("DELETE FROM oauth_tokens WHERE tenant = ?")
            .bind(hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_tenant", e))?;
        sqlx::query("DELETE FROM service_credentials WHERE tenant = ?")
            .bind(hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_tenant", e))?;
        tx.commit().await.map_err(|e| map_sqlx("delete_tenant", e))?;
        Ok(())
    }

    async fn tenant_exists(&self, hash: &str) -> StoreResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM tenants WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("tenant_exists", e))?;
        Ok(found.is_some())
    }

    async fn get_tenant_resource_count(&self, hash: &str) -> StoreResult<TenantResourceCount> {
        let oauth_tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM oauth_tokens WHERE tenant = ?")
            .bind(hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx("get_tenant_resource_count", e))?;
        let service_credentials: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM service_credentials WHERE tenant = ?")
            .bind(hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx("get_tenant_resource_count", e))?;
        Ok(TenantResourceCount {
            oauth_tokens: oauth_tokens as u64,
            service_credentials: service_credentials as u64,
        })
    }

    // -- OAuth tokens ----------------------------------------------------

    async fn store_oauth_token(&self, tenant: &str, service: &str, data: OAuthTokenData) -> StoreResult<()> {
        if !is_valid_service_name(service) {
            return Err(StoreError::Validation(format!("invalid service name: {service}")));
        }
        let scopes = serde_json::to_string(&data.scopes).unwrap_or_else(|_| "[]".to_string());
        sqlx::query(
            "INSERT INTO oauth_tokens (tenant, service, access_token, refresh_token, token_type, expires_at, scopes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(tenant, service) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_type = excluded.token_type,
                expires_at = excluded.expires_at,
                scopes = excluded.scopes,
                updated_at = excluded.updated_at",
        )
        .bind(tenant)
        .bind(service)
        .bind(&data.access_token)
        .bind(&data.refresh_token)
        .bind(&data.token_type)
        .bind(data.expires_at.map(|d| d.to_rfc3339()))
        .bind(&scopes)
        .bind(data.created_at.to_rfc3339())
        .bind(data.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("store_oauth_token", e))?;
        Ok(())
    }

    async fn get_oauth_token(&self, tenant: &str, service: &str) -> StoreResult<OAuthTokenData> {
        let row = sqlx::query(
            "SELECT access_token, refresh_token, token_type, expires_at, scopes, created_at, updated_at
             FROM oauth_tokens WHERE tenant = ? AND service = ?",
        )
        .bind(tenant)
        .bind(service)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("get_oauth_token", e))?
        .ok_or_else(|| StoreError::ServiceNotFound(service.to_string()))?;
        Ok(row_to_oauth_token(row))
    }

    async fn refresh_oauth_token(
        &self,
        tenant: &str,
        service: &str,
        new_access: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<OAuthTokenData> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE oauth_tokens SET access_token = ?, expires_at = ?, updated_at = ? WHERE tenant = ? AND service = ?",
        )
        .bind(new_access)
        .bind(expires_at.map(|d| d.to_rfc3339()))
        .bind(&now)
        .bind(tenant)
        .bind(service)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("refresh_oauth_token", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ServiceNotFound(service.to_string()));
        }
        self.get_oauth_token(tenant, service).await
    }

    async fn delete_oauth_token(&self, tenant: &str, service: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM oauth_tokens WHERE tenant = ? AND service = ?")
            .bind(tenant)
            .bind(service)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("delete_oauth_token", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ServiceNotFound(service.to_string()));
        }
        Ok(())
    }

    async fn list_oauth_tokens(&self, tenant: &str) -> StoreResult<Vec<(String, OAuthTokenData)>> {
        let rows = sqlx::query(
            "SELECT service, access_token, refresh_token, token_type, expires_at, scopes, created_at, updated_at
             FROM oauth_tokens WHERE tenant = ?",
        )
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("list_oauth_tokens", e))?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let service: String = row.get("service");
                (service, row_to_oauth_token(row))
            })
            .collect())
    }

    // -- Service credentials ----------------------------------------------

    async fn store_credentials(&self, tenant: &str, service: &str, creds: ServiceCredentials) -> StoreResult<()> {
        let kind = serde_json::to_string(&creds.kind).unwrap_or_else(|_| "\"custom\"".to_string());
        let payload = serde_json::to_string(&creds.payload).unwrap_or_else(|_| "{}".to_string());
        sqlx::query(
            "INSERT INTO service_credentials (tenant, service, kind, payload, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(tenant, service) DO UPDATE SET
                kind = excluded.kind, payload = excluded.payload, updated_at = excluded.updated_at",
        )
        .bind(tenant)
        .bind(service)
        .bind(&kind)
        .bind(&payload)
        .bind(creds.created_at.to_rfc3339())
        .bind(creds.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("store_credentials", e))?;
        Ok(())
    }

    async fn get_credentials(&self, tenant: &str, service: &str) -> StoreResult<ServiceCredentials> {
        let row = sqlx::query(
            "SELECT kind, payload, created_at, updated_at FROM service_credentials WHERE tenant = ? AND service = ?",
        )
        .bind(tenant)
        .bind(service)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("get_credentials", e))?
        .ok_or_else(|| StoreError::ServiceNotFound(service.to_string()))?;
        let kind_raw: String = row.get("kind");
        let payload_raw: String = row.get("payload");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        Ok(ServiceCredentials {
            kind: serde_json::from_str::<CredentialKind>(&kind_raw).unwrap_or(CredentialKind::Custom),
            payload: serde_json::from_str::<HashMap<String, String>>(&payload_raw).unwrap_or_default(),
            created_at: parse_ts(&created_at),
            updated_at: parse_ts(&updated_at),
        })
    }

    async fn delete_credentials(&self, tenant: &str, service: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM service_credentials WHERE tenant = ? AND service = ?")
            .bind(tenant)
            .bind(service)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("delete_credentials", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ServiceNotFound(service.to_string()));
        }
        Ok(())
    }

    async fn has_credentials(&self, tenant: &str, service: &str) -> StoreResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM service_credentials WHERE tenant = ? AND service = ?")
                .bind(tenant)
                .bind(service)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx("has_credentials", e))?;
        Ok(found.is_some())
    }

    // -- Users & linkage ---------------------------------------------------

    async fn create_user(&self, display_name: Option<String>) -> StoreResult<UserMetadata> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        sqlx::query("INSERT INTO users (id, display_name, created_at) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(&display_name)
            .bind(created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("create_user", e))?;
        Ok(UserMetadata {
            id,
            display_name,
            created_at,
        })
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<UserMetadata> {
        let row = sqlx::query("SELECT id, display_name, created_at FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("get_user", e))?
            .ok_or(StoreError::UserNotFound)?;
        Ok(row_to_user(row))
    }

    async fn list_users(&self) -> StoreResult<Vec<UserMetadata>> {
        let rows = sqlx::query("SELECT id, display_name, created_at FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx("list_users", e))?;
        Ok(rows.into_iter().map(row_to_user).collect())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx("delete_user", e))?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }
        sqlx::query("DELETE FROM user_api_keys WHERE user_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_user", e))?;
        sqlx::query("DELETE FROM knowledge WHERE user_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_user", e))?;
        tx.commit().await.map_err(|e| map_sqlx("delete_user", e))?;
        Ok(())
    }

    async fn link_api_key(&self, user: Uuid, hash: &str) -> StoreResult<()> {
        let existing: Option<String> = sqlx::query_scalar("SELECT user_id FROM user_api_keys WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("link_api_key", e))?;
        if existing.is_some() {
            return Err(StoreError::KeyAlreadyLinked);
        }
        sqlx::query("INSERT INTO user_api_keys (hash, user_id) VALUES (?, ?)")
            .bind(hash)
            .bind(user.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("link_api_key", e))?;
        Ok(())
    }

    async fn unlink_api_key(&self, hash: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM user_api_keys WHERE hash = ?")
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("unlink_api_key", e))?;
        Ok(())
    }

    async fn get_user_by_api_key(&self, hash: &str) -> StoreResult<UserMetadata> {
        let row = sqlx::query(
            "SELECT u.id as id, u.display_name as display_name, u.created_at as created_at
             FROM user_api_keys k JOIN users u ON u.id = k.user_id WHERE k.hash = ?",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("get_user_by_api_key", e))?
        .ok_or(StoreError::UserNotFound)?;
        Ok(row_to_user(row))
    }

    async fn auto_migrate_keys(&self) -> StoreResult<u64> {
        let unlinked: Vec<String> = sqlx::query_scalar(
            "SELECT hash FROM api_tokens WHERE hash NOT IN (SELECT hash FROM user_api_keys)",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("auto_migrate_keys", e))?;

        let mut migrated = 0u64;
        for hash in unlinked {
            let user = self.create_user(None).await?;
            match self.link_api_key(user.id, &hash).await {
                Ok(()) => migrated += 1,
                Err(err) => {
                    tracing::warn!(hash = %hash, error = %err, "auto-migrate link failed, cleaning up orphaned user");
                    let _ = self.delete_user(user.id).await;
                }
            }
        }
        Ok(migrated)
    }

    // -- Knowledge -----------------------------------------------------------

    async fn set_knowledge(&self, user: Uuid, domain: &str, key: &str, content: &str) -> StoreResult<KnowledgeEntry> {
        let existing_created_at: Option<String> = sqlx::query_scalar(
            "SELECT created_at FROM knowledge WHERE user_id = ? AND domain = ? AND key = ?",
        )
        .bind(user.to_string())
        .bind(domain)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("set_knowledge", e))?;
        let now = Utc::now();
        let created_at = existing_created_at.as_deref().map(parse_ts).unwrap_or(now);
        sqlx::query(
            "INSERT INTO knowledge (user_id, domain, key, content, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, domain, key) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
        )
        .bind(user.to_string())
        .bind(domain)
        .bind(key)
        .bind(content)
        .bind(created_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("set_knowledge", e))?;
        Ok(KnowledgeEntry {
            domain: domain.to_string(),
            key: key.to_string(),
            content: content.to_string(),
            created_at,
            updated_at: now,
        })
    }

    async fn get_knowledge(&self, user: Uuid, domain: &str, key: &str) -> StoreResult<KnowledgeEntry> {
        let row = sqlx::query(
            "SELECT domain, key, content, created_at, updated_at FROM knowledge WHERE user_id = ? AND domain = ? AND key = ?",
        )
        .bind(user.to_string())
        .bind(domain)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("get_knowledge", e))?
        .ok_or(StoreError::KnowledgeNotFound)?;
        Ok(row_to_knowledge(row))
    }

    async fn list_knowledge(&self, user: Uuid, domain: Option<&str>) -> StoreResult<Vec<KnowledgeEntry>> {
        let rows = match domain {
            Some(d) => sqlx::query(
                "SELECT domain, key, content, created_at, updated_at FROM knowledge WHERE user_id = ? AND domain = ? ORDER BY key",
            )
            .bind(user.to_string())
            .bind(d)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                "SELECT domain, key, content, created_at, updated_at FROM knowledge WHERE user_id = ? ORDER BY domain, key",
            )
            .bind(user.to_string())
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| map_sqlx("list_knowledge", e))?;
        Ok(rows.into_iter().map(row_to_knowledge).collect())
    }

    async fn delete_knowledge(&self, user: Uuid, domain: &str, key: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM knowledge WHERE user_id = ? AND domain = ? AND key = ?")
            .bind(user.to_string())
            .bind(domain)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("delete_knowledge", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::KnowledgeNotFound);
        }
        Ok(())
    }

    async fn rename_knowledge(&self, user: Uuid, domain: &str, old_key: &str, new_key: &str) -> StoreResult<()> {
        let collision: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM knowledge WHERE user_id = ? AND domain = ? AND key = ?",
        )
        .bind(user.to_string())
        .bind(domain)
        .bind(new_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("rename_knowledge", e))?;
        if collision.is_some() {
            return Err(StoreError::Validation(format!(
                "knowledge key '{new_key}' already exists in domain '{domain}'"
            )));
        }
        let result = sqlx::query("UPDATE knowledge SET key = ? WHERE user_id = ? AND domain = ? AND key = ?")
            .bind(new_key)
            .bind(user.to_string())
            .bind(domain)
            .bind(old_key)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("rename_knowledge", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::KnowledgeNotFound);
        }
        Ok(())
    }

    async fn search_knowledge(&self, user: Uuid, query: &str) -> StoreResult<Vec<KnowledgeEntry>> {
        let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let rows = sqlx::query(
            "SELECT domain, key, content, created_at, updated_at FROM knowledge
             WHERE user_id = ? AND (domain LIKE ? ESCAPE '\\' OR key LIKE ? ESCAPE '\\' OR content LIKE ? ESCAPE '\\')
             ORDER BY domain, key",
        )
        .bind(user.to_string())
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("search_knowledge", e))?;
        Ok(rows.into_iter().map(row_to_knowledge).collect())
    }

    // -- Auth codes ------------------------------------------------------

    async fn create_auth_code(&self, tenant: &str, service: &str, ttl_seconds: i64) -> StoreResult<String> {
        if !is_valid_service_name(service) {
            return Err(StoreError::Validation(format!("invalid service name: {service}")));
        }
        let code = generate_hex_token(16);
        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(ttl_seconds);
        sqlx::query(
            "INSERT INTO auth_codes (code, tenant_hash, service, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&code)
        .bind(tenant)
        .bind(service)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("create_auth_code", e))?;
        Ok(code)
    }

    async fn validate_auth_code(&self, code: &str) -> StoreResult<AuthCodeData> {
        let row = sqlx::query("SELECT tenant_hash, service, created_at, expires_at FROM auth_codes WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("validate_auth_code", e))?
            .ok_or(StoreError::AuthCodeNotFound)?;
        let created_at: String = row.get("created_at");
        let expires_at: String = row.get("expires_at");
        let data = AuthCodeData {
            tenant_hash: row.get("tenant_hash"),
            service: row.get("service"),
            created_at: parse_ts(&created_at),
            expires_at: parse_ts(&expires_at),
        };
        if data.is_expired(Utc::now()) {
            return Err(StoreError::AuthCodeNotFound);
        }
        Ok(data)
    }

    async fn cleanup_expired_auth_codes(&self) -> StoreResult<u64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("DELETE FROM auth_codes WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("cleanup_expired_auth_codes", e))?;
        Ok(result.rows_affected())
    }

    // -- Admin -------------------------------------------------------------

    async fn backup(&self, path: &str) -> StoreResult<()> {
        sqlx::query("VACUUM INTO ?")
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("backup", e))?;
        Ok(())
    }
}

fn row_to_oauth_token(row: sqlx::sqlite::SqliteRow) -> OAuthTokenData {
    let refresh_token: Option<String> = row.get("refresh_token");
    let expires_at: Option<String> = row.get("expires_at");
    let scopes_raw: String = row.get("scopes");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    OAuthTokenData {
        access_token: row.get("access_token"),
        refresh_token,
        token_type: row.get("token_type"),
        expires_at: expires_at.as_deref().map(parse_ts),
        scopes: serde_json::from_str(&scopes_raw).unwrap_or_default(),
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    }
}

fn row_to_user(row: sqlx::sqlite::SqliteRow) -> UserMetadata {
    let id_raw: String = row.get("id");
    let created_at: String = row.get("created_at");
    UserMetadata {
        id: Uuid::from_str(&id_raw).unwrap_or_else(|_| Uuid::nil()),
        display_name: row.get("display_name"),
        created_at: parse_ts(&created_at),
    }
}

fn row_to_knowledge(row: sqlx::sqlite::SqliteRow) -> KnowledgeEntry {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    KnowledgeEntry {
        domain: row.get("domain"),
        key: row.get("key"),
        content: row.get("content"),
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_temp() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("test.db")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn add_and_validate_api_token_round_trips() {
        let (store, _dir) = open_temp().await;
        let (plaintext, hash) = store.add_api_token("test token").await.unwrap();
        let resolved = store.validate_api_token(&plaintext).await.unwrap();
        assert_eq!(resolved, hash);
        assert!(store.tenant_exists(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn delete_api_token_cascades_to_tenant() {
        let (store, _dir) = open_temp().await;
        let (_plaintext, hash) = store.add_api_token("will be deleted").await.unwrap();
        store.delete_api_token(&hash).await.unwrap();
        assert!(matches!(store.get_tenant_info(&hash).await, Err(StoreError::TenantNotFound)));
    }

    #[tokio::test]
    async fn resolve_api_token_detects_ambiguous_prefix() {
        let (store, _dir) = open_temp().await;
        let (_p1, h1) = store.add_api_token("one").await.unwrap();
        // Force a collision by resolving an empty prefix against both tokens.
        let (_p2, _h2) = store.add_api_token("two").await.unwrap();
        let resolved = store.resolve_api_token(&h1).await.unwrap();
        assert_eq!(resolved, h1);
        assert!(matches!(store.resolve_api_token("").await, Err(StoreError::AmbiguousPrefix)));
    }

    #[tokio::test]
    async fn link_api_key_rejects_double_link() {
        let (store, _dir) = open_temp().await;
        let (_plaintext, hash) = store.add_api_token("linked").await.unwrap();
        store.unlink_api_key(&hash).await.unwrap();
        let user = store.create_user(Some("alice".into())).await.unwrap();
        store.link_api_key(user.id, &hash).await.unwrap();
        let other = store.create_user(None).await.unwrap();
        assert!(matches!(
            store.link_api_key(other.id, &hash).await,
            Err(StoreError::KeyAlreadyLinked)
        ));
    }

    #[tokio::test]
    async fn auto_migrate_keys_creates_users_for_unlinked_tokens() {
        let (store, _dir) = open_temp().await;
        let (_plaintext, hash) = store.add_api_token("legacy").await.unwrap();
        let migrated = store.auto_migrate_keys().await.unwrap();
        assert_eq!(migrated, 1);
        let user = store.get_user_by_api_key(&hash).await.unwrap();
        assert!(user.display_name.is_none());
    }

    #[tokio::test]
    async fn knowledge_set_preserves_created_at_on_update() {
        let (store, _dir) = open_temp().await;
        let user = store.create_user(None).await.unwrap();
        let first = store.set_knowledge(user.id, "notes", "k1", "v1").await.unwrap();
        let second = store.set_knowledge(user.id, "notes", "k1", "v2").await.unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.content, "v2");
    }

    #[tokio::test]
    async fn search_knowledge_is_case_insensitive_substring() {
        let (store, _dir) = open_temp().await;
        let user = store.create_user(None).await.unwrap();
        store.set_knowledge(user.id, "work", "ticket", "Fix the Gateway").await.unwrap();
        let found = store.search_knowledge(user.id, "gateway").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn auth_code_rejects_expired_without_deleting() {
        let (store, _dir) = open_temp().await;
        let code = store.create_auth_code("tenant1", "svc", -1).await.unwrap();
        assert!(matches!(store.validate_auth_code(&code).await, Err(StoreError::AuthCodeNotFound)));
    }

    #[tokio::test]
    async fn reopening_same_schema_version_succeeds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        SqliteStore::open(&path).await.unwrap();
        SqliteStore::open(&path).await.unwrap();
    }
}
