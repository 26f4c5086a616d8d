//! Maps `StoreError` onto `CoreError` for the server-side call sites that
//! aren't specifically about outbound auth (`mcpfusion-auth` has its own
//! copy of this mapping scoped to credential lookups).

use mcpfusion_core::CoreError;
use mcpfusion_interfaces::StoreError;

pub fn to_core_error(err: StoreError) -> CoreError {
    match err {
        StoreError::Validation(msg) => CoreError::Validation(msg),
        other if other.is_not_found() => CoreError::NotFound(other.to_string()),
        other => CoreError::Database {
            op: "store".to_string(),
            source: other.to_string(),
        },
    }
}
