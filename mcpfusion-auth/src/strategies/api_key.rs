//! `api_key` strategy: a stored credential sets a configured header (default
//! `X-API-Key`) or query parameter.

use async_trait::async_trait;
use mcpfusion_config::AuthConfig;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use std::sync::Arc;

use crate::strategy::{AuthStrategy, RequestAuth};

pub struct ApiKeyStrategy {
    store: Arc<dyn Store>,
}

impl ApiKeyStrategy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthStrategy for ApiKeyStrategy {
    fn name(&self) -> &'static str {
        "api_key"
    }

    async fn authenticate(
        &self,
        tenant: &str,
        service: &str,
        config: &AuthConfig,
        request: &mut RequestAuth,
    ) -> Result<(), CoreError> {
        let AuthConfig::ApiKey { header, query_param } = config else {
            return Err(CoreError::Configuration(
                "api_key strategy requires an ApiKey auth config".to_string(),
            ));
        };

        let creds = self
            .store
            .get_credentials(tenant, service)
            .await
            .map_err(crate::store_err::to_core_error)?;
        let key = creds.payload.get("api_key").ok_or(CoreError::AuthMissing)?;

        if let Some(param) = query_param {
            request.query.insert(param.clone(), key.clone());
        } else {
            request.headers.insert(header.clone(), key.clone());
        }
        Ok(())
    }
}
