//! `AuthManager`: registers strategies by name and routes per-request on
//! `authConfig.strategy`.

use mcpfusion_config::AuthConfig;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use std::collections::HashMap;
use std::sync::Arc;

use crate::refresh::RefreshCoordinator;
use crate::strategies::{
    ApiKeyStrategy, BasicStrategy, BearerStrategy, Oauth2DeviceStrategy, Oauth2ExternalStrategy,
    SessionJwtStrategy,
};
use crate::strategy::{AuthStrategy, RequestAuth};

pub struct AuthManager {
    strategies: HashMap<&'static str, Arc<dyn AuthStrategy>>,
    refresh_coordinator: RefreshCoordinator,
}

impl AuthManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let mut strategies: HashMap<&'static str, Arc<dyn AuthStrategy>> = HashMap::new();
        strategies.insert("bearer", Arc::new(BearerStrategy::new(store.clone())));
        strategies.insert("api_key", Arc::new(ApiKeyStrategy::new(store.clone())));
        strategies.insert("basic", Arc::new(BasicStrategy::new(store.clone())));
        strategies.insert("oauth2_device", Arc::new(Oauth2DeviceStrategy::new(store.clone())));
        strategies.insert("oauth2_external", Arc::new(Oauth2ExternalStrategy::new(store.clone())));
        strategies.insert("session_jwt", Arc::new(SessionJwtStrategy::new(store)));

        Self {
            strategies,
            refresh_coordinator: RefreshCoordinator::new(),
        }
    }

    fn strategy_for(&self, config: &AuthConfig) -> Result<&Arc<dyn AuthStrategy>, CoreError> {
        self.strategies
            .get(config.strategy_name())
            .ok_or_else(|| CoreError::Configuration(format!("unknown auth strategy: {}", config.strategy_name())))
    }

    /// Injects credentials for one request. Never refreshes itself — the
    /// request pipeline calls [`Self::refresh`] on `CoreError::AuthExpired`
    /// and retries exactly once.
    pub async fn authenticate(
        &self,
        tenant: &str,
        service: &str,
        config: &AuthConfig,
    ) -> Result<RequestAuth, CoreError> {
        let strategy = self.strategy_for(config)?;
        let mut request = RequestAuth::new();
        strategy.authenticate(tenant, service, config, &mut request).await?;
        Ok(request)
    }

    /// Single-flight refresh for (tenant, service): exactly one caller
    /// performs the strategy's refresh; concurrent callers share the lock
    /// and, once it clears, re-read whatever the leader persisted.
    pub async fn refresh(&self, tenant: &str, service: &str, config: &AuthConfig) -> Result<(), CoreError> {
        let strategy = self.strategy_for(config)?.clone();
        if !strategy.supports_refresh() {
            return Err(CoreError::AuthRefreshFailed(format!(
                "{} does not support refresh",
                strategy.name()
            )));
        }

        self.refresh_coordinator
            .exclusive(tenant, service, || async move {
                if strategy.is_fresh(tenant, service, config).await {
                    return Ok(());
                }
                strategy.refresh(tenant, service, config).await.map(|_| ())
            })
            .await
    }

    /// Convenience combining authenticate-then-refresh-then-retry, for
    /// callers that don't need to distinguish the two steps.
    pub async fn authenticate_with_refresh(
        &self,
        tenant: &str,
        service: &str,
        config: &AuthConfig,
    ) -> Result<RequestAuth, CoreError> {
        match self.authenticate(tenant, service, config).await {
            Err(CoreError::AuthExpired) => {
                self.refresh(tenant, service, config).await?;
                self.authenticate(tenant, service, config).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use mcpfusion_core::domain::{
        ApiTokenMetadata, AuthCodeData, KnowledgeEntry, OAuthTokenData, ServiceCredentials,
        TenantInfo, TenantResourceCount, UserMetadata,
    };
    use mcpfusion_interfaces::{ApiTokenListing, StoreError, StoreResult};
    use std::collections::HashMap as StdHashMap;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Default)]
    struct FakeStore {
        credentials: TokioMutex<StdHashMap<(String, String), ServiceCredentials>>,
        oauth_tokens: TokioMutex<StdHashMap<(String, String), OAuthTokenData>>,
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn add_api_token(&self, _description: &str) -> StoreResult<(String, String)> {
            unimplemented!()
        }
        async fn validate_api_token(&self, _plaintext: &str) -> StoreResult<String> {
            unimplemented!()
        }
        async fn delete_api_token(&self, _hash: &str) -> StoreResult<()> {
            unimplemented!()
        }
        async fn list_api_tokens(&self) -> StoreResult<Vec<ApiTokenListing>> {
            unimplemented!()
        }
        async fn get_api_token_metadata(&self, _hash: &str) -> StoreResult<ApiTokenMetadata> {
            unimplemented!()
        }
        async fn resolve_api_token(&self, _prefix_or_hash: &str) -> StoreResult<String> {
            unimplemented!()
        }
        async fn get_tenant_info(&self, _hash: &str) -> StoreResult<TenantInfo> {
            unimplemented!()
        }
        async fn list_tenants(&self) -> StoreResult<Vec<(String, TenantInfo)>> {
            unimplemented!()
        }
        async fn update_tenant_metadata(&self, _hash: &str, _info: TenantInfo) -> StoreResult<()> {
            unimplemented!()
        }
        async fn update_tenant_last_used(&self, _hash: &str) {}
        async fn delete_tenant(&self, _hash: &str) -> StoreResult<()> {
            unimplemented!()
        }
        async fn tenant_exists(&self, _hash: &str) -> StoreResult<bool> {
            unimplemented!()
        }
        async fn get_tenant_resource_count(&self, _hash: &str) -> StoreResult<TenantResourceCount> {
            unimplemented!()
        }
        async fn store_oauth_token(&self, tenant: &str, service: &str, data: OAuthTokenData) -> StoreResult<()> {
            self.oauth_tokens
                .lock()
                .await
                .insert((tenant.to_string(), service.to_string()), data);
            Ok(())
        }
        async fn get_oauth_token(&self, tenant: &str, service: &str) -> StoreResult<OAuthTokenData> {
            self.oauth_tokens
                .lock()
                .await
                .get(&(tenant.to_string(), service.to_string()))
                .cloned()
                .ok_or(StoreError::TokenNotFound)
        }
        async fn refresh_oauth_token(
            &self,
            _tenant: &str,
            _service: &str,
            _new_access: &str,
            _expires_at: Option<chrono::DateTime<Utc>>,
        ) -> StoreResult<OAuthTokenData> {
            unimplemented!()
        }
        async fn delete_oauth_token(&self, _tenant: &str, _service: &str) -> StoreResult<()> {
            unimplemented!()
        }
        async fn list_oauth_tokens(&self, _tenant: &str) -> StoreResult<Vec<(String, OAuthTokenData)>> {
            unimplemented!()
        }
        async fn store_credentials(&self, tenant: &str, service: &str, creds: ServiceCredentials) -> StoreResult<()> {
            self.credentials
                .lock()
                .await
                .insert((tenant.to_string(), service.to_string()), creds);
            Ok(())
        }
        async fn get_credentials(&self, tenant: &str, service: &str) -> StoreResult<ServiceCredentials> {
            self.credentials
                .lock()
                .await
                .get(&(tenant.to_string(), service.to_string()))
                .cloned()
                .ok_or(StoreError::ServiceNotFound(service.to_string()))
        }
        async fn delete_credentials(&self, _tenant: &str, _service: &str) -> StoreResult<()> {
            unimplemented!()
        }
        async fn has_credentials(&self, _tenant: &str, _service: &str) -> StoreResult<bool> {
            unimplemented!()
        }
        async fn create_user(&self, _display_name: Option<String>) -> StoreResult<UserMetadata> {
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
        async fn link_api_key(&self, _user: uuid::Uuid, _hash: &str) -> StoreResult<()> {
            unimplemented!()
        }
        async fn unlink_api_key(&self, _hash: &str) -> StoreResult<()> {
            unimplemented!()
        }
        async fn get_user_by_api_key(&self, _hash: &str) -> StoreResult<UserMetadata> {
            unimplemented!()
        }
        async fn auto_migrate_keys(&self) -> StoreResult<u64> {
            unimplemented!()
        }
        async fn set_knowledge(
            &self,
            _user: uuid::Uuid,
            _domain: &str,
            _key: &str,
            _content: &str,
        ) -> StoreResult<KnowledgeEntry> {
            unimplemented!()
        }
        async fn get_knowledge(&self, _user: uuid::Uuid, _domain: &str, _key: &str) -> StoreResult<KnowledgeEntry> {
            unimplemented!()
        }
        async fn list_knowledge(
            &self,
            _user: uuid::Uuid,
            _domain: Option<&str>,
        ) -> StoreResult<Vec<KnowledgeEntry>> {
            unimplemented!()
        }
        async fn delete_knowledge(&self, _user: uuid::Uuid, _domain: &str, _key: &str) -> StoreResult<()> {
            unimplemented!()
        }
        async fn rename_knowledge(
            &self,
            _user: uuid::Uuid,
            _domain: &str,
            _old_key: &str,
            _new_key: &str,
        ) -> StoreResult<()> {
            unimplemented!()
        }
        async fn search_knowledge(&self, _user: uuid::Uuid, _query: &str) -> StoreResult<Vec<KnowledgeEntry>> {
            unimplemented!()
        }
        async fn create_auth_code(&self, _tenant: &str, _service: &str, _ttl_seconds: i64) -> StoreResult<String> {
            unimplemented!()
        }
        async fn validate_auth_code(&self, _code: &str) -> StoreResult<AuthCodeData> {
            unimplemented!()
        }
        async fn cleanup_expired_auth_codes(&self) -> StoreResult<u64> {
            unimplemented!()
        }
        async fn backup(&self, _path: &str) -> StoreResult<()> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn bearer_strategy_injects_authorization_header() {
        let store = Arc::new(FakeStore::default());
        let mut payload = StdHashMap::new();
        payload.insert("token".to_string(), "secret-token".to_string());
        store
            .store_credentials(
                "tenant-a",
                "svc",
                ServiceCredentials {
                    kind: mcpfusion_core::domain::CredentialKind::Bearer,
                    payload,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let manager = AuthManager::new(store);
        let request = manager
            .authenticate("tenant-a", "svc", &AuthConfig::Bearer)
            .await
            .unwrap();
        assert_eq!(
            request.headers.get("Authorization"),
            Some(&"Bearer secret-token".to_string())
        );
    }

    #[tokio::test]
    async fn missing_credentials_surface_as_auth_missing() {
        let store = Arc::new(FakeStore::default());
        let manager = AuthManager::new(store);
        let err = manager
            .authenticate("tenant-a", "svc", &AuthConfig::Bearer)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AuthMissing));
    }

    #[tokio::test]
    async fn unsupported_refresh_strategy_errors() {
        let store = Arc::new(FakeStore::default());
        let manager = AuthManager::new(store);
        let err = manager.refresh("tenant-a", "svc", &AuthConfig::Bearer).await.unwrap_err();
        assert!(matches!(err, CoreError::AuthRefreshFailed(_)));
    }

    /// Concurrent callers racing `refresh` for an already-fresh token must
    /// all short-circuit inside the lock instead of each reaching the
    /// provider — the provider URLs here are unroutable, so a caller that
    /// skips the freshness recheck would error out and this test would fail.
    #[tokio::test]
    async fn concurrent_refresh_of_fresh_token_skips_provider_call() {
        let store = Arc::new(FakeStore::default());
        store
            .store_oauth_token(
                "tenant-a",
                "svc",
                OAuthTokenData {
                    access_token: "still-good".to_string(),
                    refresh_token: None,
                    token_type: "Bearer".to_string(),
                    expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
                    scopes: vec![],
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let manager = Arc::new(AuthManager::new(store));
        let config = AuthConfig::Oauth2Device {
            client_id: "id".to_string(),
            client_secret: None,
            device_authorization_url: "https://auth.invalid/device".to_string(),
            token_url: "https://auth.invalid/token".to_string(),
            scopes: vec![],
            refresh_buffer_seconds: 300,
        };

        let mut handles = Vec::new();
        for _ in 0..4 {
            let manager = manager.clone();
            let config = config.clone();
            handles.push(tokio::spawn(async move { manager.refresh("tenant-a", "svc", &config).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }
}
