//! Correlation id generation and propagation into tracing spans: every tool
//! invocation gets one id, logged on every stage it passes through,
//! independent of whatever transport-level request id the MCP component in
//! front of this crate uses.

use tracing::Span;
use uuid::Uuid;

pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Opens the span a tool dispatch runs under. Tenant hashes are redacted via
/// `mcpfusion_core::sanitize_hash` before they ever reach a log line.
pub fn tool_span(correlation_id: &str, tenant_hash: &str, tool_name: &str) -> Span {
    tracing::info_span!(
        "tool_dispatch",
        correlation_id = %correlation_id,
        tenant = %mcpfusion_core::sanitize_hash(tenant_hash),
        tool = %tool_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_ids_are_unique() {
        assert_ne!(new_correlation_id(), new_correlation_id());
    }
}
