//! Domain-specific configuration modules.

pub mod auth;
pub mod command;
pub mod logging;
pub mod service;
pub mod utils;

use crate::error::{ConfigError, ConfigResult};
use crate::validation::Validatable;
use command::CommandGroupConfig;
use serde::{Deserialize, Serialize};
use service::ServiceConfig;
use std::collections::HashMap;

/// The full tool graph loaded from one or more config files.
/// Files are merged by union; overlapping keys within or across files are a
/// fatal load error, so this struct itself never needs to resolve conflicts
/// — only the loader's merge step does.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct McpFusionConfig {
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,
    #[serde(default)]
    pub commands: HashMap<String, CommandGroupConfig>,
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl McpFusionConfig {
    pub fn validate_all(&self) -> ConfigResult<()> {
        for (key, service) in &self.services {
            service.validate().map_err(|e| wrap_key_error("services", key, e))?;
        }
        for (key, command) in &self.commands {
            command.validate().map_err(|e| wrap_key_error("commands", key, e))?;
        }
        self.logging.validate()?;
        Ok(())
    }

    /// Every tool name this graph would synthesize,
    /// used by the loader to detect endpoint/command id collisions up front.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (service_key, service) in &self.services {
            for endpoint in &service.endpoints {
                names.push(format!("{service_key}_{}", endpoint.id));
            }
        }
        for command_key in self.commands.keys() {
            names.push(format!("command_{command_key}"));
        }
        names
    }
}

fn wrap_key_error(section: &str, key: &str, err: ConfigError) -> ConfigError {
    ConfigError::DomainError {
        domain: section.to_string(),
        message: format!("'{key}': {err}"),
    }
}
