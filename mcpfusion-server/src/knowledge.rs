//! Knowledge Tools: thin wrappers around the Persistent Store's
//! knowledge CRUD, scoped to the tenant's linked user. A tenant whose API
//! token was never linked to a user has nowhere to store entries, so every
//! knowledge tool call is rejected up front for that case.

use crate::auth_middleware::TenantContext;
use crate::store_err::to_core_error;
use mcpfusion_core::domain::KnowledgeEntry;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use serde_json::Value as JsonValue;
use std::sync::Arc;

fn require_user(tenant: &TenantContext) -> Result<uuid::Uuid, CoreError> {
    tenant.user_id.ok_or_else(|| {
        CoreError::AuthForbidden("this API token is not linked to a user; link it before using knowledge tools".to_string())
    })
}

pub async fn knowledge_set(store: &Arc<dyn Store>, tenant: &TenantContext, args: &JsonValue) -> Result<JsonValue, CoreError> {
    let user = require_user(tenant)?;
    let domain = required_str(args, "domain")?;
    let key = required_str(args, "key")?;
    let content = required_str(args, "content")?;

    let entry = store
        .set_knowledge(user, domain, key, content)
        .await
        .map_err(to_core_error)?;
    Ok(entry_to_json(&entry))
}

/// Three modes depending on which of `domain`/`key` are present: both ->
/// one entry, domain only -> every entry in that domain, neither -> every
/// entry the user owns.
pub async fn knowledge_get(store: &Arc<dyn Store>, tenant: &TenantContext, args: &JsonValue) -> Result<JsonValue, CoreError> {
    let user = require_user(tenant)?;
    let domain = optional_str(args, "domain");
    let key = optional_str(args, "key");

    match (domain, key) {
        (Some(domain), Some(key)) => {
            let entry = store.get_knowledge(user, domain, key).await.map_err(to_core_error)?;
            Ok(entry_to_json(&entry))
        }
        (Some(domain), None) => {
            let entries = store.list_knowledge(user, Some(domain)).await.map_err(to_core_error)?;
            Ok(entries_to_json(&entries))
        }
        (None, Some(_)) => Err(CoreError::Validation(
            "a 'key' without a 'domain' is ambiguous".to_string(),
        )),
        (None, None) => {
            let entries = store.list_knowledge(user, None).await.map_err(to_core_error)?;
            Ok(entries_to_json(&entries))
        }
    }
}

pub async fn knowledge_delete(store: &Arc<dyn Store>, tenant: &TenantContext, args: &JsonValue) -> Result<JsonValue, CoreError> {
    let user = require_user(tenant)?;
    let domain = required_str(args, "domain")?;
    let key = required_str(args, "key")?;

    store.delete_knowledge(user, domain, key).await.map_err(to_core_error)?;
    Ok(serde_json::json!({ "deleted": true }))
}

fn required_str<'a>(args: &'a JsonValue, field: &str) -> Result<&'a str, CoreError> {
    args.get(field)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| CoreError::Validation(format!("missing required field '{field}'")))
}

fn optional_str<'a>(args: &'a JsonValue, field: &str) -> Option<&'a str> {
    args.get(field).and_then(JsonValue::as_str)
}

fn entry_to_json(entry: &KnowledgeEntry) -> JsonValue {
    serde_json::json!({
        "domain": entry.domain,
        "key": entry.key,
        "content": entry.content,
        "created_at": entry.created_at,
        "updated_at": entry.updated_at,
    })
}

fn entries_to_json(entries: &[KnowledgeEntry]) -> JsonValue {
    JsonValue::Array(entries.iter().map(entry_to_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlinked_tenant_is_rejected() {
        let tenant = TenantContext {
            hash: "x".to_string(),
            user_id: None,
            noauth: false,
        };
        assert!(matches!(require_user(&tenant), Err(CoreError::AuthForbidden(_))));
    }

    #[tokio::test]
    async fn get_with_key_but_no_domain_is_rejected() {
        use async_trait::async_trait;
        use mcpfusion_core::domain::*;
        use mcpfusion_interfaces::{ApiTokenListing, StoreError, StoreResult};

        struct FakeStore;
        #[async_trait]
        impl Store for FakeStore {
            async fn add_api_token(&self, _d: &str) -> StoreResult<(String, String)> {
                unimplemented!()
            }
            async fn validate_api_token(&self, _p: &str) -> StoreResult<String> {
                unimplemented!()
            }
            async fn delete_api_token(&self, _h: &str) -> StoreResult<()> {
                unimplemented!()
            }
            async fn list_api_tokens(&self) -> StoreResult<Vec<ApiTokenListing>> {
                unimplemented!()
            }
            async fn get_api_token_metadata(&self, _h: &str) -> StoreResult<ApiTokenMetadata> {
                unimplemented!()
            }
            async fn resolve_api_token(&self, _p: &str) -> StoreResult<String> {
                unimplemented!()
            }
            async fn get_tenant_info(&self, _h: &str) -> StoreResult<TenantInfo> {
                unimplemented!()
            }
            async fn list_tenants(&self) -> StoreResult<Vec<(String, TenantInfo)>> {
                unimplemented!()
            }
            async fn update_tenant_metadata(&self, _h: &str, _i: TenantInfo) -> StoreResult<()> {
                unimplemented!()
            }
            async fn update_tenant_last_used(&self, _h: &str) {}
            async fn delete_tenant(&self, _h: &str) -> StoreResult<()> {
                unimplemented!()
            }
            async fn tenant_exists(&self, _h: &str) -> StoreResult<bool> {
                unimplemented!()
            }
            async fn get_tenant_resource_count(&self, _h: &str) -> StoreResult<TenantResourceCount> {
                unimplemented!()
            }
            async fn store_oauth_token(&self, _t: &str, _s: &str, _d: OAuthTokenData) -> StoreResult<()> {
                unimplemented!()
            }
            async fn get_oauth_token(&self, _t: &str, _s: &str) -> StoreResult<OAuthTokenData> {
                unimplemented!()
            }
            async fn refresh_oauth_token(
                &self,
                _t: &str,
                _s: &str,
                _a: &str,
                _e: Option<chrono::DateTime<chrono::Utc>>,
            ) -> StoreResult<OAuthTokenData> {
                unimplemented!()
            }
            async fn delete_oauth_token(&self, _t: &str, _s: &str) -> StoreResult<()> {
                unimplemented!()
            }
            async fn list_oauth_tokens(&self, _t: &str) -> StoreResult<Vec<(String, OAuthTokenData)>> {
                unimplemented!()
            }
            async fn store_credentials(&self, _t: &str, _s: &str, _c: ServiceCredentials) -> StoreResult<()> {
                unimplemented!()
            }
            async fn get_credentials(&self, _t: &str, _s: &str) -> StoreResult<ServiceCredentials> {
                unimplemented!()
            }
            async fn delete_credentials(&self, _t: &str, _s: &str) -> StoreResult<()> {
                unimplemented!()
            }
            async fn has_credentials(&self, _t: &str, _s: &str) -> StoreResult<bool> {
                unimplemented!()
            }
            async fn create_user(&self, _d: Option<String>) -> StoreResult<UserMetadata> {
                unimplemented!()
            }
            async fn get_user(&self, _id: uuid::Uuid) -> StoreResult<UserMetadata> {
                unimplemented!()
            }
            async fn list_users(&self) -> StoreResult<Vec<UserMetadata>> {
                unimplemented!()
            }
            async fn delete_user(&self, _id: uuid::Uuid) -> StoreResult<()> {
                unimplemented!()
            }
            async fn link_api_key(&self, _u: uuid::Uuid, _h: &str) -> StoreResult<()> {
                unimplemented!()
            }
            async fn unlink_api_key(&self, _h: &str) -> StoreResult<()> {
                unimplemented!()
            }
            async fn get_user_by_api_key(&self, _h: &str) -> StoreResult<UserMetadata> {
                unimplemented!()
            }
            async fn auto_migrate_keys(&self) -> StoreResult<u64> {
                unimplemented!()
            }
            async fn set_knowledge(&self, _u: uuid::Uuid, _d: &str, _k: &str, _c: &str) -> StoreResult<KnowledgeEntry> {
                unimplemented!()
            }
            async fn get_knowledge(&self, _u: uuid::Uuid, _d: &str, _k: &str) -> StoreResult<KnowledgeEntry> {
                unimplemented!()
            }
            async fn list_knowledge(&self, _u: uuid::Uuid, _d: Option<&str>) -> StoreResult<Vec<KnowledgeEntry>> {
                unimplemented!()
            }
            async fn delete_knowledge(&self, _u: uuid::Uuid, _d: &str, _k: &str) -> StoreResult<()> {
                unimplemented!()
            }
            async fn rename_knowledge(&self, _u: uuid::Uuid, _d: &str, _o: &str, _n: &str) -> StoreResult<()> {
                unimplemented!()
            }
            async fn search_knowledge(&self, _u: uuid::Uuid, _q: &str) -> StoreResult<Vec<KnowledgeEntry>> {
                unimplemented!()
            }
            async fn create_auth_code(&self, _t: &str, _s: &str, _ttl: i64) -> StoreResult<String> {
                unimplemented!()
            }
            async fn validate_auth_code(&self, _c: &str) -> StoreResult<AuthCodeData> {
                unimplemented!()
            }
            async fn cleanup_expired_auth_codes(&self) -> StoreResult<u64> {
                unimplemented!()
            }
            async fn backup(&self, _p: &str) -> StoreResult<()> {
                unimplemented!()
            }
        }

        let store: Arc<dyn Store> = Arc::new(FakeStore);
        let tenant = TenantContext {
            hash: "x".to_string(),
            user_id: Some(uuid::Uuid::nil()),
            noauth: false,
        };
        let args = serde_json::json!({"key": "only-key"});
        let err = knowledge_get(&store, &tenant, &args).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
