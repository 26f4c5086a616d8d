//! The tool-provider seam: resolves a tool name against the
//! currently installed config graph, runs the Authorizer hook, and routes to
//! whichever pipeline the tool's kind names. This is the boundary an MCP wire
//! server component sits behind; this crate stops at "take a tool name and
//! arguments, return a result or an error" and never touches JSON-RPC framing.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use mcpfusion_config::ConfigHandle;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::{Authorizer, Store, ToolRequest};
use mcpfusion_resilience::ShutdownCoordinator;
use tokio::task::JoinHandle;

use crate::auth_middleware::TenantContext;
use crate::catalog::{KnowledgeOp, ToolCatalog, ToolKind};
use crate::knowledge;
use crate::pipeline::{command::dispatch_command, http::HttpPipeline};

/// Composes the catalog, both pipelines, the store and the authorizer hook
/// into the single entry point a tool-provider-shaped server component calls.
pub struct GatewayService {
    pub config: ConfigHandle,
    pub http: HttpPipeline,
    pub store: Arc<dyn Store>,
    pub authorizer: Arc<dyn Authorizer>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub(crate) background: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl GatewayService {
    /// Lists the currently synthesized tools; rebuilt from the live config
    /// graph on every call so a hot reload is visible without extra
    /// invalidation plumbing.
    pub fn catalog(&self) -> ToolCatalog {
        ToolCatalog::build(&self.config.current())
    }

    /// Signals the idle sweeper, cache sweep and auth-code cleanup
    /// background tasks to stop, then waits briefly for them to exit.
    /// Called once from the process entry point on SIGTERM/SIGINT.
    pub async fn shutdown(&self) {
        if let Err(err) = self.shutdown.shutdown().await {
            tracing::warn!(%err, "shutdown coordinator did not reach a clean stop");
        }
        let handles = std::mem::take(&mut *self.background.lock().await);
        for handle in handles {
            if tokio::time::timeout(std::time::Duration::from_secs(5), handle).await.is_err() {
                tracing::warn!("background task did not exit within the shutdown grace period");
            }
        }
    }

    pub async fn dispatch_tool(
        &self,
        tenant: &TenantContext,
        tool_name: &str,
        invocation: &JsonValue,
    ) -> Result<JsonValue, CoreError> {
        let config = self.config.current();
        let catalog = ToolCatalog::build(&config);
        let tool = catalog
            .get(tool_name)
            .ok_or_else(|| CoreError::NotFound(format!("unknown tool '{tool_name}'")))?;

        let service_name = match &tool.kind {
            ToolKind::Endpoint { service_key, .. } => config
                .services
                .get(service_key)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| service_key.clone()),
            ToolKind::Command { .. } => "command".to_string(),
            ToolKind::Knowledge(_) => "knowledge".to_string(),
        };

        self.authorizer
            .authorize(&ToolRequest {
                tenant_hash: tenant.hash.clone(),
                service_name,
                tool_name: tool_name.to_string(),
            })
            .await?;

        match &tool.kind {
            ToolKind::Endpoint { service_key, endpoint_id } => {
                let service = config
                    .services
                    .get(service_key)
                    .ok_or_else(|| CoreError::Configuration(format!("service '{service_key}' vanished from the config graph")))?;
                let endpoint = service
                    .endpoints
                    .iter()
                    .find(|e| &e.id == endpoint_id)
                    .ok_or_else(|| CoreError::Configuration(format!("endpoint '{endpoint_id}' vanished from the config graph")))?;
                self.http.dispatch(service_key, service, endpoint, &tenant.hash, invocation).await
            }
            ToolKind::Command { command_id } => {
                let command = config
                    .commands
                    .values()
                    .find(|c| &c.id == command_id)
                    .ok_or_else(|| CoreError::Configuration(format!("command '{command_id}' vanished from the config graph")))?;
                dispatch_command(command, invocation).await
            }
            ToolKind::Knowledge(op) => match op {
                KnowledgeOp::Set => knowledge::knowledge_set(&self.store, tenant, invocation).await,
                KnowledgeOp::Get => knowledge::knowledge_get(&self.store, tenant, invocation).await,
                KnowledgeOp::Delete => knowledge::knowledge_delete(&self.store, tenant, invocation).await,
            },
        }
    }
}
