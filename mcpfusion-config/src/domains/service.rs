//! Service / endpoint / parameter configuration.
//!
//! A `ServiceConfig` describes one upstream REST API: its base URL, default
//! auth strategy, and the endpoints synthesized into MCP tools. Parameters
//! are shared verbatim with [`crate::domains::command::CommandGroupConfig`]
//! since both endpoints and commands dispatch through the same binding rules.

use crate::domains::auth::AuthConfig;
use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};
use mcpfusion_core::HttpMethod;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Display name; the map key it's stored under is the service_key.
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
    pub endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    pub response_defaults: Option<ResponseDefaults>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseDefaults {
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default)]
    pub rename: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub method: HttpMethod,
    /// May contain `{param}` path segments.
    pub path: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub body_template: Option<serde_json::Value>,
    #[serde(default)]
    pub response: Option<ResponseDefaults>,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,
    #[serde(default)]
    pub caching: Option<CachingConfig>,
    #[serde(default)]
    pub connection: ConnectionOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum PaginationConfig {
    NextLink { field: String, max_pages: u32 },
    Offset { param: String, size_param: String, page_size: u32, max_pages: u32 },
    Cursor { cursor_param: String, cursor_field: String, max_pages: u32 },
}

impl PaginationConfig {
    pub fn max_pages(&self) -> u32 {
        match self {
            PaginationConfig::NextLink { max_pages, .. } => *max_pages,
            PaginationConfig::Offset { max_pages, .. } => *max_pages,
            PaginationConfig::Cursor { max_pages, .. } => *max_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachingConfig {
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectionOverrides {
    #[serde(default)]
    pub disable_keep_alive: bool,
    #[serde(default)]
    pub force_new_connection: bool,
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<std::time::Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    Argument,
    Arglist,
    Environment,
    Stdin,
    Control,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParameterValidation {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub r#enum: Vec<String>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    /// Upstream (non-MCP) name.
    pub name: String,
    /// MCP-legal alias; derived from `name` when absent.
    #[serde(default)]
    pub alias: Option<String>,
    /// Prefix emitted ahead of the value for argv-style parameters, e.g. `--flag`.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub description: String,
    pub r#type: ParameterType,
    #[serde(default)]
    pub required: bool,
    pub location: ParameterLocation,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub validation: ParameterValidation,
    #[serde(default)]
    pub examples: Vec<serde_json::Value>,
    #[serde(default)]
    pub transform: Option<String>,
    #[serde(default)]
    pub quoted: bool,
    /// Static parameters ignore caller-supplied values and require a default.
    #[serde(default)]
    pub r#static: bool,
}

impl Validatable for ServiceConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.name, "name", self.domain_name())?;
        validate_url(&self.base_url, "base_url", self.domain_name())?;
        if self.endpoints.is_empty() {
            return Err(self.validation_error("service must declare at least one endpoint"));
        }
        for endpoint in &self.endpoints {
            endpoint.validate()?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "service"
    }
}

impl Validatable for EndpointConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.id, "id", self.domain_name())?;
        validate_required_string(&self.path, "path", self.domain_name())?;

        let mut seen_aliases = std::collections::HashSet::new();
        for param in &self.parameters {
            param.validate()?;
            let alias = param.resolved_alias().ok_or_else(|| {
                self.validation_error(format!(
                    "parameter '{}' has no characters usable in an MCP-legal alias",
                    param.name
                ))
            })?;
            if !seen_aliases.insert(alias.clone()) {
                return Err(self.validation_error(format!(
                    "parameter alias '{alias}' collides with another parameter on endpoint '{}'",
                    self.id
                )));
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "endpoint"
    }
}

impl Validatable for ParameterConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.name, "name", self.domain_name())?;
        if let Some(alias) = &self.alias {
            if !mcpfusion_core::validation::is_mcp_legal_name(alias) {
                return Err(self.validation_error(format!("alias '{alias}' is not MCP-legal")));
            }
        }
        if self.r#static && self.default.is_none() {
            return Err(self.validation_error(format!(
                "static parameter '{}' must declare a default",
                self.name
            )));
        }
        if let Some(default) = &self.default {
            self.validate_against_declared(default)?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "parameter"
    }
}

impl ParameterConfig {
    /// The MCP-legal name exposed to callers: the explicit alias, or one
    /// derived from `name` by stripping illegal characters.
    pub fn resolved_alias(&self) -> Option<String> {
        match &self.alias {
            Some(alias) => Some(alias.clone()),
            None => mcpfusion_core::validation::derive_mcp_alias(&self.name),
        }
    }

    fn validate_against_declared(&self, value: &serde_json::Value) -> ConfigResult<()> {
        if let Some(pattern) = &self.validation.pattern {
            if let Some(s) = value.as_str() {
                let re = regex::Regex::new(pattern)
                    .map_err(|e| self.validation_error(format!("invalid pattern: {e}")))?;
                if !re.is_match(s) {
                    return Err(self.validation_error(format!(
                        "default value '{s}' does not satisfy pattern '{pattern}'"
                    )));
                }
            }
        }
        if !self.validation.r#enum.is_empty() {
            if let Some(s) = value.as_str() {
                if !self.validation.r#enum.iter().any(|v| v == s) {
                    return Err(self.validation_error(format!(
                        "default value '{s}' is not one of the declared enum values"
                    )));
                }
            }
        }
        Ok(())
    }
}
