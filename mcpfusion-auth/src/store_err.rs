//! Maps `StoreError` onto the auth-relevant subset of `CoreError`.

use mcpfusion_core::CoreError;
use mcpfusion_interfaces::StoreError;

/// `NotFound`-shaped store errors (missing credentials/tokens) become
/// `AuthMissing` so the request pipeline surfaces "you need to set this up"
/// rather than a generic database failure.
pub fn to_core_error(err: StoreError) -> CoreError {
    if err.is_not_found() {
        CoreError::AuthMissing
    } else {
        CoreError::Database {
            op: "auth".to_string(),
            source: err.to_string(),
        }
    }
}
