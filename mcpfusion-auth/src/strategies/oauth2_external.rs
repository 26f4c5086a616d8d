//! `oauth2_external` strategy: expects a token obtained by an
//! external helper via the auth-code handoff to already be stored. Refreshes
//! using the stored refresh token; hard errors when nothing is stored yet.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use mcpfusion_config::AuthConfig;
use mcpfusion_core::domain::OAuthTokenData;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use std::collections::HashMap;
use std::sync::Arc;

use crate::oauth_client::{post_form, TokenResponse};
use crate::strategy::{AuthStrategy, RequestAuth};

pub struct Oauth2ExternalStrategy {
    store: Arc<dyn Store>,
}

impl Oauth2ExternalStrategy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthStrategy for Oauth2ExternalStrategy {
    fn name(&self) -> &'static str {
        "oauth2_external"
    }

    fn supports_refresh(&self) -> bool {
        true
    }

    async fn authenticate(
        &self,
        tenant: &str,
        service: &str,
        config: &AuthConfig,
        request: &mut RequestAuth,
    ) -> Result<(), CoreError> {
        let AuthConfig::Oauth2External { refresh_buffer_seconds, .. } = config else {
            return Err(CoreError::Configuration(
                "oauth2_external strategy requires an Oauth2External auth config".to_string(),
            ));
        };

        let token = self
            .store
            .get_oauth_token(tenant, service)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    CoreError::AuthMissing
                } else {
                    crate::store_err::to_core_error(err)
                }
            })?;

        let buffer = ChronoDuration::seconds(*refresh_buffer_seconds);
        let stale = token.expires_at.is_some_and(|exp| exp - buffer <= Utc::now());
        if stale {
            return Err(CoreError::AuthExpired);
        }
        request
            .headers
            .insert("Authorization".to_string(), format!("Bearer {}", token.access_token));
        Ok(())
    }

    async fn is_fresh(&self, tenant: &str, service: &str, config: &AuthConfig) -> bool {
        let AuthConfig::Oauth2External { refresh_buffer_seconds, .. } = config else {
            return false;
        };
        match self.store.get_oauth_token(tenant, service).await {
            Ok(token) => {
                let buffer = ChronoDuration::seconds(*refresh_buffer_seconds);
                match token.expires_at {
                    Some(exp) => exp - buffer > Utc::now(),
                    None => true,
                }
            }
            Err(_) => false,
        }
    }

    async fn refresh(
        &self,
        tenant: &str,
        service: &str,
        config: &AuthConfig,
    ) -> Result<OAuthTokenData, CoreError> {
        let AuthConfig::Oauth2External { token_url, client_id, client_secret, .. } = config else {
            return Err(CoreError::Configuration(
                "oauth2_external strategy requires an Oauth2External auth config".to_string(),
            ));
        };

        let existing = self
            .store
            .get_oauth_token(tenant, service)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    CoreError::AuthMissing
                } else {
                    crate::store_err::to_core_error(err)
                }
            })?;
        let refresh_token = existing.refresh_token.ok_or_else(|| {
            CoreError::AuthRefreshFailed(
                "no refresh token stored; re-run the external auth helper".to_string(),
            )
        })?;

        let mut form: HashMap<&str, &str> = HashMap::new();
        form.insert("grant_type", "refresh_token");
        form.insert("refresh_token", &refresh_token);
        form.insert("client_id", client_id);
        if let Some(secret) = client_secret.as_deref() {
            form.insert("client_secret", secret);
        }

        let token: TokenResponse = post_form(token_url, &form).await?;
        let now = Utc::now();
        let expires_at = token.expires_in.map(|secs| now + ChronoDuration::seconds(secs));
        self.store
            .refresh_oauth_token(tenant, service, &token.access_token, expires_at)
            .await
            .map_err(crate::store_err::to_core_error)
    }
}
