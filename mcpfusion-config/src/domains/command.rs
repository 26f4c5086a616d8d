//! Command group configuration — the config-side counterpart of the
//! Command Pipeline. A `CommandGroupConfig` synthesizes one `command_{id}`
//! MCP tool per declared command, dispatched by `mcpfusion-command`.

use crate::domains::service::ParameterConfig;
use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandGroupConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub executable: String,
    #[serde(default)]
    pub use_shell: bool,
    #[serde(default = "default_shell_interpreter")]
    pub shell_interpreter: String,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_kill_grace_seconds")]
    pub kill_grace_seconds: u64,
    #[serde(default = "default_true")]
    pub capture_stdout: bool,
    #[serde(default = "default_true")]
    pub capture_stderr: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
}

fn default_shell_interpreter() -> String {
    "/bin/sh".to_string()
}

fn default_timeout_seconds() -> u64 {
    180
}

fn default_kill_grace_seconds() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Validatable for CommandGroupConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.id, "id", self.domain_name())?;
        validate_required_string(&self.executable, "executable", self.domain_name())?;

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
                    "parameter alias '{alias}' collides with another parameter on command '{}'",
                    self.id
                )));
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CommandGroupConfig {
            id: "backup".into(),
            name: "Backup".into(),
            description: String::new(),
            executable: "/usr/bin/backup".into(),
            use_shell: false,
            shell_interpreter: default_shell_interpreter(),
            cwd: None,
            timeout_seconds: default_timeout_seconds(),
            kill_grace_seconds: default_kill_grace_seconds(),
            capture_stdout: true,
            capture_stderr: true,
            parameters: vec![],
        };
        assert_eq!(cfg.timeout_seconds, 180);
        assert_eq!(cfg.kill_grace_seconds, 5);
        assert_eq!(cfg.shell_interpreter, "/bin/sh");
        assert!(cfg.validate().is_ok());
    }
}
