//! `oauth2_device` strategy: on first use, or whenever no
//! refresh token is available to repair an expired one, initiates the
//! device-code flow and polls until the user completes it externally.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use mcpfusion_config::AuthConfig;
use mcpfusion_core::domain::OAuthTokenData;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::oauth_client::{is_pending_error, post_form, DeviceAuthorizationResponse, TokenResponse};
use crate::strategy::{AuthStrategy, RequestAuth};

pub struct Oauth2DeviceStrategy {
    store: Arc<dyn Store>,
}

impl Oauth2DeviceStrategy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn run_device_flow(
        &self,
        tenant: &str,
        service: &str,
        client_id: &str,
        client_secret: Option<&str>,
        device_authorization_url: &str,
        token_url: &str,
        scopes: &[String],
    ) -> Result<OAuthTokenData, CoreError> {
        let mut form: HashMap<&str, &str> = HashMap::new();
        form.insert("client_id", client_id);
        let scope_joined = scopes.join(" ");
        if !scope_joined.is_empty() {
            form.insert("scope", &scope_joined);
        }
        let device: DeviceAuthorizationResponse = post_form(device_authorization_url, &form).await?;

        tracing::info!(
            tenant,
            service,
            verification_uri = %device.verification_uri,
            user_code = %device.user_code,
            "device flow started; user must complete authorization externally"
        );

        let deadline = std::time::Instant::now() + Duration::from_secs(device.expires_in.max(0) as u64);
        let mut interval = Duration::from_secs(device.interval.max(1) as u64);

        loop {
            if std::time::Instant::now() >= deadline {
                return Err(CoreError::AuthRefreshFailed(
                    "device authorization expired before user completed the flow".to_string(),
                ));
            }
            tokio::time::sleep(interval).await;

            let mut poll_form: HashMap<&str, &str> = HashMap::new();
            poll_form.insert("grant_type", "urn:ietf:params:oauth:grant-type:device_code");
            poll_form.insert("device_code", &device.device_code);
            poll_form.insert("client_id", client_id);
            if let Some(secret) = client_secret {
                poll_form.insert("client_secret", secret);
            }

            match post_form::<TokenResponse>(token_url, &poll_form).await {
                Ok(token) => return Ok(token_response_to_data(token, Utc::now())),
                Err(err) => match is_pending_error(&err) {
                    Some(slow_down) => {
                        if slow_down {
                            interval += Duration::from_secs(5);
                        }
                        continue;
                    }
                    None => return Err(err),
                },
            }
        }
    }
}

#[async_trait]
impl AuthStrategy for Oauth2DeviceStrategy {
    fn name(&self) -> &'static str {
        "oauth2_device"
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
        let AuthConfig::Oauth2Device { refresh_buffer_seconds, .. } = config else {
            return Err(CoreError::Configuration(
                "oauth2_device strategy requires an Oauth2Device auth config".to_string(),
            ));
        };

        match self.store.get_oauth_token(tenant, service).await {
            Ok(token) => {
                let buffer = ChronoDuration::seconds(*refresh_buffer_seconds);
                let stale = token
                    .expires_at
                    .is_some_and(|exp| exp - buffer <= Utc::now());
                if stale {
                    return Err(CoreError::AuthExpired);
                }
                request
                    .headers
                    .insert("Authorization".to_string(), format!("Bearer {}", token.access_token));
                Ok(())
            }
            Err(err) if err.is_not_found() => Err(CoreError::AuthExpired),
            Err(err) => Err(crate::store_err::to_core_error(err)),
        }
    }

    async fn is_fresh(&self, tenant: &str, service: &str, config: &AuthConfig) -> bool {
        let AuthConfig::Oauth2Device { refresh_buffer_seconds, .. } = config else {
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
        let AuthConfig::Oauth2Device {
            client_id,
            client_secret,
            device_authorization_url,
            token_url,
            scopes,
            ..
        } = config
        else {
            return Err(CoreError::Configuration(
                "oauth2_device strategy requires an Oauth2Device auth config".to_string(),
            ));
        };

        let existing = self.store.get_oauth_token(tenant, service).await.ok();
        if let Some(refresh_token) = existing.as_ref().and_then(|t| t.refresh_token.as_deref()) {
            let mut form: HashMap<&str, &str> = HashMap::new();
            form.insert("grant_type", "refresh_token");
            form.insert("refresh_token", refresh_token);
            form.insert("client_id", client_id);
            if let Some(secret) = client_secret.as_deref() {
                form.insert("client_secret", secret);
            }
            if let Ok(token) = post_form::<TokenResponse>(token_url, &form).await {
                let data = token_response_to_data(token, Utc::now());
                self.store
                    .refresh_oauth_token(tenant, service, &data.access_token, data.expires_at)
                    .await
                    .map_err(crate::store_err::to_core_error)?;
                return self
                    .store
                    .get_oauth_token(tenant, service)
                    .await
                    .map_err(crate::store_err::to_core_error);
            }
            tracing::warn!(tenant, service, "oauth2_device refresh failed, re-initiating device flow");
        }

        let token = self
            .run_device_flow(
                tenant,
                service,
                client_id,
                client_secret.as_deref(),
                device_authorization_url,
                token_url,
                scopes,
            )
            .await?;
        self.store
            .store_oauth_token(tenant, service, token.clone())
            .await
            .map_err(crate::store_err::to_core_error)?;
        Ok(token)
    }
}

fn token_response_to_data(token: TokenResponse, now: DateTime<Utc>) -> OAuthTokenData {
    OAuthTokenData {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        token_type: token.token_type,
        expires_at: token.expires_in.map(|secs| now + ChronoDuration::seconds(secs)),
        scopes: token
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        created_at: now,
        updated_at: now,
    }
}
