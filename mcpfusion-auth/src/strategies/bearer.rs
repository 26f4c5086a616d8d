//! `bearer` strategy: a stored credential of kind `Bearer` becomes an
//! `Authorization: Bearer <token>` header.

use async_trait::async_trait;
use mcpfusion_config::AuthConfig;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use std::sync::Arc;

use crate::strategy::{AuthStrategy, RequestAuth};

pub struct BearerStrategy {
    store: Arc<dyn Store>,
}

impl BearerStrategy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthStrategy for BearerStrategy {
    fn name(&self) -> &'static str {
        "bearer"
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
        let token = creds
            .payload
            .get("token")
            .ok_or(CoreError::AuthMissing)?;
        request
            .headers
            .insert("Authorization".to_string(), format!("Bearer {token}"));
        Ok(())
    }
}
