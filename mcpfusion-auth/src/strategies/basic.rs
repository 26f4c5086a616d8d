//! `basic` strategy: base64 of stored `user:password` as
//! `Authorization: Basic …`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use mcpfusion_config::AuthConfig;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use std::sync::Arc;

use crate::strategy::{AuthStrategy, RequestAuth};

pub struct BasicStrategy {
    store: Arc<dyn Store>,
}

impl BasicStrategy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthStrategy for BasicStrategy {
    fn name(&self) -> &'static str {
        "basic"
    }

    async fn authenticate(
        &self,
        tenant: &str,
        service: &str,
        _config: &AuthConfig,
        request: &mut RequestAuth,
    ) -> Result<(), CoreError> {
        let creds = self
            .store
            .get_credentials(tenant, service)
            .await
            .map_err(crate::store_err::to_core_error)?;
        let user = creds.payload.get("username").ok_or(CoreError::AuthMissing)?;
        let password = creds.payload.get("password").ok_or(CoreError::AuthMissing)?;

        let encoded = STANDARD.encode(format!("{user}:{password}"));
        request
            .headers
            .insert("Authorization".to_string(), format!("Basic {encoded}"));
        Ok(())
    }
}
