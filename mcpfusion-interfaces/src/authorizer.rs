//! The Authorizer hook. Runs inside the tool handler, after
//! dispatch, with only the identifiers named in `ToolRequest` — it has no
//! reach into tenant or service internals beyond that.

use async_trait::async_trait;
use mcpfusion_core::CoreError;

/// The minimal context an authorization decision needs.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub tenant_hash: String,
    pub service_name: String,
    pub tool_name: String,
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Returning `Err` denies execution; the error becomes the caller-facing
    /// `AuthForbidden` response.
    async fn authorize(&self, request: &ToolRequest) -> Result<(), CoreError>;
}

/// Default implementation: allow everything ("default allow-all").
#[derive(Debug, Clone, Default)]
pub struct AllowAllAuthorizer;

#[async_trait]
impl Authorizer for AllowAllAuthorizer {
    async fn authorize(&self, _request: &ToolRequest) -> Result<(), CoreError> {
        Ok(())
    }
}
