//! Error taxonomy shared by every pipeline stage

use thiserror::Error;

/// Result alias for the common core error type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// The cross-cutting error taxonomy shared across crates. Individual crates define
/// their own leaf error enums (`StorageError`, `HttpError`, ...) and convert
/// into this one at crate boundaries so the request pipeline can categorize
/// uniformly without downcasting.
#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication required")]
    AuthMissing,

    #[error("authentication expired")]
    AuthExpired,

    #[error("authentication refresh failed: {0}")]
    AuthRefreshFailed(String),

    #[error("authorization denied: {0}")]
    AuthForbidden(String),

    #[error("upstream error (transient): {0}")]
    UpstreamTransient(String),

    #[error("upstream error: {0}")]
    UpstreamPermanent(String),

    #[error("circuit open for {host}, retry after cool-down")]
    CircuitOpen { host: String },

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("database error during {op}: {source}")]
    Database { op: String, source: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Whether the request pipeline should retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::UpstreamTransient(_) | CoreError::Timeout(_))
    }

    /// A short machine-readable tag for logs and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::NotFound(_) => "not_found",
            CoreError::AuthMissing => "auth_missing",
            CoreError::AuthExpired => "auth_expired",
            CoreError::AuthRefreshFailed(_) => "auth_refresh_failed",
            CoreError::AuthForbidden(_) => "auth_forbidden",
            CoreError::UpstreamTransient(_) => "upstream_transient",
            CoreError::UpstreamPermanent(_) => "upstream_permanent",
            CoreError::CircuitOpen { .. } => "circuit_open",
            CoreError::Timeout(_) => "timeout",
            CoreError::Database { .. } => "database",
            CoreError::Configuration(_) => "configuration",
            CoreError::Other(_) => "other",
        }
    }
}

/// Redacts a tenant/token hash for logging: first 12 hex chars + an ellipsis.
/// Short inputs are returned unchanged since there is nothing left to redact.
pub fn sanitize_hash(hash: &str) -> String {
    if hash.len() <= 12 {
        hash.to_string()
    } else {
        format!("{}…", &hash[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(CoreError::UpstreamTransient("x".into()).is_retryable());
        assert!(CoreError::Timeout("x".into()).is_retryable());
        assert!(!CoreError::UpstreamPermanent("x".into()).is_retryable());
        assert!(!CoreError::Validation("x".into()).is_retryable());
    }

    #[test]
    fn sanitizes_long_hashes_only() {
        let long = "a".repeat(64);
        assert_eq!(sanitize_hash(&long), format!("{}…", &long[..12]));
        assert_eq!(sanitize_hash("short"), "short");
    }
}
