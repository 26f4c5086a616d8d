//! `session_jwt` strategy: mirrors `oauth2_external` but its
//! token endpoint takes a JSON refresh body (`{"refresh_token": "..."}`)
//! rather than the standard form-encoded OAuth2 grant.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use mcpfusion_config::AuthConfig;
use mcpfusion_core::domain::OAuthTokenData;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::strategy::{AuthStrategy, RequestAuth};

#[derive(Deserialize)]
struct SessionTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct SessionJwtStrategy {
    store: Arc<dyn Store>,
}

impl SessionJwtStrategy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client configuration is always valid")
    }
}

#[async_trait]
impl AuthStrategy for SessionJwtStrategy {
    fn name(&self) -> &'static str {
        "session_jwt"
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
        let AuthConfig::SessionJwt { refresh_buffer_seconds, .. } = config else {
            return Err(CoreError::Configuration(
                "session_jwt strategy requires a SessionJwt auth config".to_string(),
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
        let AuthConfig::SessionJwt { refresh_buffer_seconds, .. } = config else {
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
        let AuthConfig::SessionJwt { token_url, .. } = config else {
            return Err(CoreError::Configuration(
                "session_jwt strategy requires a SessionJwt auth config".to_string(),
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
            CoreError::AuthRefreshFailed("no refresh token stored for session_jwt".to_string())
        })?;

        let response = self
            .http_client()
            .post(token_url)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() || err.is_connect() {
                    CoreError::UpstreamTransient(err.to_string())
                } else {
                    CoreError::UpstreamPermanent(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(CoreError::AuthRefreshFailed(format!(
                "session refresh endpoint returned {}",
                response.status()
            )));
        }

        let body: SessionTokenResponse = response
            .json()
            .await
            .map_err(|err| CoreError::AuthRefreshFailed(format!("malformed session refresh response: {err}")))?;

        let now = Utc::now();
        let expires_at = body.expires_in.map(|secs| now + ChronoDuration::seconds(secs));
        self.store
            .refresh_oauth_token(tenant, service, &body.access_token, expires_at)
            .await
            .map_err(crate::store_err::to_core_error)?;

        if let Some(new_refresh) = body.refresh_token {
            let mut refreshed = self
                .store
                .get_oauth_token(tenant, service)
                .await
                .map_err(crate::store_err::to_core_error)?;
            refreshed.refresh_token = Some(new_refresh.clone());
            self.store
                .store_oauth_token(tenant, service, refreshed.clone())
                .await
                .map_err(crate::store_err::to_core_error)?;
            return Ok(refreshed);
        }

        self.store
            .get_oauth_token(tenant, service)
            .await
            .map_err(crate::store_err::to_core_error)
    }
}
