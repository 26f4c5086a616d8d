//! Shared validation primitives referenced by storage, config and the
//! parameter system so shared validation constraints are defined once.

use once_cell::sync::Lazy;
use regex::Regex;

/// `^[A-Za-z0-9_.-]{1,64}$` — an MCP-legal tool/parameter name (glossary).
static MCP_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]{1,64}$").unwrap());

/// `[a-zA-Z0-9._ -]{1,64}` — a service/endpoint/command name.
static SERVICE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._ -]{1,64}$").unwrap());

static HEX64: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());
static HEX_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{32,128}$").unwrap());

pub fn is_mcp_legal_name(s: &str) -> bool {
    MCP_NAME.is_match(s)
}

pub fn is_valid_service_name(s: &str) -> bool {
    !s.is_empty() && s.len() <= 64 && SERVICE_NAME.is_match(s)
}

pub fn is_valid_hash(s: &str) -> bool {
    HEX64.is_match(s)
}

pub fn is_valid_token(s: &str) -> bool {
    HEX_TOKEN.is_match(s)
}

pub fn is_valid_description(s: &str) -> bool {
    s.len() <= 256
}

/// Derives an MCP-legal alias from an arbitrary upstream parameter name by
/// stripping characters outside the legal class. Returns `None` if nothing
/// legal remains.
pub fn derive_mcp_alias(upstream_name: &str) -> Option<String> {
    let stripped: String = upstream_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let truncated: String = stripped.chars().take(64).collect();
    if truncated.is_empty() {
        None
    } else {
        Some(truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcp_name_boundaries() {
        assert!(is_mcp_legal_name("a"));
        assert!(is_mcp_legal_name(&"a".repeat(64)));
        assert!(!is_mcp_legal_name(&"a".repeat(65)));
        assert!(!is_mcp_legal_name(""));
        assert!(!is_mcp_legal_name("has space"));
        assert!(!is_mcp_legal_name("has$dollar"));
    }

    #[test]
    fn service_name_boundaries() {
        assert!(is_valid_service_name("microsoft365"));
        assert!(!is_valid_service_name(""));
        assert!(!is_valid_service_name(&"a".repeat(65)));
        assert!(!is_valid_service_name("bad$name"));
    }

    #[test]
    fn token_length_boundaries() {
        assert!(!is_valid_token(&"a".repeat(31)));
        assert!(is_valid_token(&"a".repeat(32)));
        assert!(is_valid_token(&"a".repeat(128)));
        assert!(!is_valid_token(&"a".repeat(129)));
    }

    #[test]
    fn alias_derivation_strips_illegal_chars() {
        assert_eq!(derive_mcp_alias("user.name"), Some("user.name".to_string()));
        assert_eq!(derive_mcp_alias("user name!"), Some("username".to_string()));
        assert_eq!(derive_mcp_alias("$$$"), None);
    }
}
