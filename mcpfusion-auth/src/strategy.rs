//! The `AuthStrategy` trait: polymorphic over
//! `{Name, SupportsRefresh, Authenticate, Refresh}`.

use async_trait::async_trait;
use mcpfusion_config::AuthConfig;
use mcpfusion_core::domain::OAuthTokenData;
use mcpfusion_core::CoreError;
use std::collections::HashMap;

/// Credential material accumulated for a single outgoing request. The
/// request pipeline merges `headers` into the assembled HTTP request and
/// `query` into the assembled query string.
#[derive(Debug, Clone, Default)]
pub struct RequestAuth {
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

impl RequestAuth {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports_refresh(&self) -> bool {
        false
    }

    /// Injects credentials into `request`. Returns `CoreError::AuthExpired`
    /// when a stored token is past its refresh buffer — the caller (the
    /// `AuthManager`) is responsible for triggering `refresh` and retrying
    /// authentication exactly once.
    async fn authenticate(
        &self,
        tenant: &str,
        service: &str,
        config: &AuthConfig,
        request: &mut RequestAuth,
    ) -> Result<(), CoreError>;

    /// Performs a refresh and returns the new token. Strategies that don't
    /// support refresh never have this called — `AuthManager` checks
    /// `supports_refresh` first.
    async fn refresh(
        &self,
        _tenant: &str,
        _service: &str,
        _config: &AuthConfig,
    ) -> Result<OAuthTokenData, CoreError> {
        Err(CoreError::AuthRefreshFailed(format!(
            "{} does not support refresh",
            self.name()
        )))
    }

    /// Re-checks the stored token's freshness. Called under the
    /// per-(tenant, service) refresh lock, after it's been acquired, so a
    /// caller that was merely waiting on a concurrent refresh can observe
    /// what the leader just persisted and skip its own provider round trip.
    /// Strategies that don't support refresh never have this called.
    async fn is_fresh(&self, _tenant: &str, _service: &str, _config: &AuthConfig) -> bool {
        false
    }
}
