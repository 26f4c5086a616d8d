//! Inbound Authentication Middleware: resolves the API token on
//! every request that isn't on the skip-list into a `TenantContext`, distinct
//! from `mcpfusion-auth`'s outbound per-service credential strategies. The
//! Authorizer hook (`mcpfusion_interfaces::Authorizer`) runs later, inside
//! the tool dispatch, once the tool name is known.

use crate::store_err::to_core_error;
use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use std::sync::Arc;

/// Tenant identity installed when `-no-auth` is passed; never a real token
/// hash, so it can never collide with one.
pub const NOAUTH_TENANT: &str = "NOAUTH";

const SKIP_PATHS: &[&str] = &["/health", "/metrics", "/status", "/capabilities"];

fn is_skip_path(path: &str) -> bool {
    SKIP_PATHS.contains(&path) || path.starts_with("/oauth/")
}

#[derive(Debug, Clone)]
pub struct TenantContext {
    pub hash: String,
    pub user_id: Option<uuid::Uuid>,
    pub noauth: bool,
}

/// Resolves the tenant for one request. `authorization_header` is the raw
/// `Authorization` header value, if present.
pub async fn resolve_tenant(
    store: &Arc<dyn Store>,
    authorization_header: Option<&str>,
    no_auth_mode: bool,
) -> Result<TenantContext, CoreError> {
    let Some(header) = authorization_header else {
        return if no_auth_mode {
            Ok(TenantContext {
                hash: NOAUTH_TENANT.to_string(),
                user_id: None,
                noauth: true,
            })
        } else {
            Err(CoreError::AuthMissing)
        };
    };

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| CoreError::AuthForbidden("Authorization header is not a bearer token".to_string()))?;

    let hash = store
        .validate_api_token(token)
        .await
        .map_err(|_| CoreError::AuthForbidden("invalid API token".to_string()))?;

    let user_id = match store.get_user_by_api_key(&hash).await {
        Ok(user) => Some(user.id),
        Err(err) if err.is_not_found() => None,
        Err(err) => return Err(to_core_error(err)),
    };

    touch_last_used(store.clone(), hash.clone());

    Ok(TenantContext {
        hash,
        user_id,
        noauth: false,
    })
}

/// Updates `last_used` without holding up the request; failures are logged
/// at warning level and never surfaced to the caller — touching the
/// last-used timestamp is bookkeeping, not part of the tool's own result.
fn touch_last_used(store: Arc<dyn Store>, hash: String) {
    tokio::spawn(async move {
        store.update_tenant_last_used(&hash).await;
    });
}

#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub store: Arc<dyn Store>,
    pub no_auth: bool,
}

/// Axum middleware wiring `resolve_tenant` into the request extensions so
/// handlers can pull `TenantContext` out without re-parsing the header.
pub async fn tenant_middleware(State(state): State<AuthMiddlewareState>, mut req: Request, next: Next) -> Response {
    if is_skip_path(req.uri().path()) {
        return next.run(req).await;
    }

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match resolve_tenant(&state.store, header.as_deref(), state.no_auth).await {
        Ok(tenant) => {
            req.extensions_mut().insert(tenant);
            next.run(req).await
        }
        Err(CoreError::AuthMissing) | Err(CoreError::AuthForbidden(_)) => {
            (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
        }
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "tenant resolution failed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcpfusion_core::domain::*;
    use mcpfusion_interfaces::{ApiTokenListing, StoreError, StoreResult};

    struct FakeStore;

    #[async_trait]
    impl Store for FakeStore {
        async fn add_api_token(&self, _d: &str) -> StoreResult<(String, String)> {
            unimplemented!()
        }
        async fn validate_api_token(&self, plaintext: &str) -> StoreResult<String> {
            if plaintext == "good-token" {
                Ok("a".repeat(64))
            } else {
                Err(StoreError::TokenNotFound)
            }
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
            Err(StoreError::UserNotFound)
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

    #[tokio::test]
    async fn missing_header_without_no_auth_is_rejected() {
        let store: Arc<dyn Store> = Arc::new(FakeStore);
        let err = resolve_tenant(&store, None, false).await.unwrap_err();
        assert!(matches!(err, CoreError::AuthMissing));
    }

    #[tokio::test]
    async fn missing_header_with_no_auth_installs_sentinel() {
        let store: Arc<dyn Store> = Arc::new(FakeStore);
        let tenant = resolve_tenant(&store, None, true).await.unwrap();
        assert_eq!(tenant.hash, NOAUTH_TENANT);
        assert!(tenant.noauth);
    }

    #[tokio::test]
    async fn valid_token_resolves_tenant_without_linked_user() {
        let store: Arc<dyn Store> = Arc::new(FakeStore);
        let tenant = resolve_tenant(&store, Some("Bearer good-token"), false).await.unwrap();
        assert_eq!(tenant.hash, "a".repeat(64));
        assert!(tenant.user_id.is_none());
    }

    #[tokio::test]
    async fn invalid_token_is_forbidden() {
        let store: Arc<dyn Store> = Arc::new(FakeStore);
        let err = resolve_tenant(&store, Some("Bearer bad-token"), false).await.unwrap_err();
        assert!(matches!(err, CoreError::AuthForbidden(_)));
    }

    #[test]
    fn skip_paths_bypass_auth() {
        assert!(is_skip_path("/health"));
        assert!(is_skip_path("/oauth/callback"));
        assert!(!is_skip_path("/tools/call"));
    }
}
