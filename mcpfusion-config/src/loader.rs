//! Configuration loading: multi-file JSON union, duplicate-key detection,
//! and hot reload with atomic swap.

use crate::domains::command::CommandGroupConfig;
use crate::domains::service::ServiceConfig;
use crate::domains::McpFusionConfig;
use crate::envfile;
use crate::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

const CONFIGS_ENV: &str = "MCP_FUSION_CONFIGS";
const LEGACY_CONFIG_ENV: &str = "MCP_FUSION_CONFIG";

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    services: HashMap<String, ServiceConfig>,
    #[serde(default)]
    commands: HashMap<String, CommandGroupConfig>,
}

pub struct ConfigLoader {
    paths: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Resolves the `-config <csv>` flag, falling back to
    /// `MCP_FUSION_CONFIGS` and then the legacy `MCP_FUSION_CONFIG` env var.
    pub fn resolve(flag: Option<&str>) -> ConfigResult<Self> {
        let csv = flag
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIGS_ENV).ok())
            .or_else(|| std::env::var(LEGACY_CONFIG_ENV).ok())
            .ok_or_else(|| {
                ConfigError::ValidationError(
                    "no config files given: pass -config or set MCP_FUSION_CONFIGS".to_string(),
                )
            })?;
        let paths = csv.split(',').map(|s| PathBuf::from(s.trim())).collect();
        Ok(Self::new(paths))
    }

    /// Reads, parses, merges (by union) and validates every configured file.
    pub fn load(&self) -> ConfigResult<McpFusionConfig> {
        let mut merged = McpFusionConfig::default();

        for path in &self.paths {
            let file = self.load_file(path)?;
            for (key, service) in file.services {
                if merged.services.insert(key.clone(), service).is_some() {
                    return Err(ConfigError::ValidationError(format!(
                        "duplicate service key '{key}' across config files"
                    )));
                }
            }
            for (key, command) in file.commands {
                if merged.commands.insert(key.clone(), command).is_some() {
                    return Err(ConfigError::ValidationError(format!(
                        "duplicate command key '{key}' across config files"
                    )));
                }
            }
        }

        merged.validate_all()?;
        check_unique_tool_names(&merged)?;
        Ok(merged)
    }

    fn load_file(&self, path: &Path) -> ConfigResult<ConfigFile> {
        let raw = std::fs::read_to_string(path)?;
        let expanded = envfile::expand_vars(&raw);
        let file: ConfigFile = serde_json::from_str(&expanded)?;
        Ok(file)
    }
}

fn check_unique_tool_names(config: &McpFusionConfig) -> ConfigResult<()> {
    let mut seen = std::collections::HashSet::new();
    for name in config.tool_names() {
        if !seen.insert(name.clone()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate synthesized tool name '{name}'"
            )));
        }
    }
    Ok(())
}

/// Holds the currently-installed config graph behind a lock cheap enough to
/// read on every dispatch; swapped wholesale on a successful hot reload.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<McpFusionConfig>>>,
}

impl ConfigHandle {
    pub fn new(initial: McpFusionConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    pub fn current(&self) -> Arc<McpFusionConfig> {
        self.inner.read().expect("config lock poisoned").clone()
    }

    fn swap(&self, next: McpFusionConfig) {
        *self.inner.write().expect("config lock poisoned") = Arc::new(next);
    }
}

/// Watches every configured file for modification-time changes; on change,
/// reloads and validates a candidate graph and swaps it in only on success.
/// Failed reloads are logged and the previous graph stays installed.
pub async fn watch_for_changes(loader: Arc<ConfigLoader>, handle: ConfigHandle, poll_interval: std::time::Duration) {
    let mut last_modified: HashMap<PathBuf, std::time::SystemTime> = HashMap::new();
    loop {
        tokio::time::sleep(poll_interval).await;

        let mut changed = false;
        for path in &loader.paths {
            if let Ok(meta) = std::fs::metadata(path) {
                if let Ok(modified) = meta.modified() {
                    let prior = last_modified.insert(path.clone(), modified);
                    if prior.is_some_and(|p| p != modified) {
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            continue;
        }

        match loader.load() {
            Ok(candidate) => {
                tracing::info!("config reload succeeded, swapping in new graph");
                handle.swap(candidate);
            }
            Err(err) => {
                tracing::warn!(error = %err, "config reload failed validation, keeping previous graph");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn merges_services_across_files_and_rejects_duplicates() {
        let a = write_temp(
            r#"{"services": {"github": {"name": "GitHub", "base_url": "https://api.github.com", "endpoints": [
                {"id": "repo", "name": "Get repo", "method": "GET", "path": "/repos/{owner}/{repo}"}
            ]}}}"#,
        );
        let b = write_temp(r#"{"commands": {"backup": {"id": "backup", "name": "Backup", "executable": "/usr/bin/backup"}}}"#);
        let loader = ConfigLoader::new(vec![a.path().to_path_buf(), b.path().to_path_buf()]);
        let merged = loader.load().unwrap();
        assert!(merged.services.contains_key("github"));
        assert!(merged.commands.contains_key("backup"));
    }

    #[test]
    fn duplicate_service_key_across_files_is_fatal() {
        let a = write_temp(
            r#"{"services": {"github": {"name": "GitHub", "base_url": "https://api.github.com", "endpoints": [
                {"id": "repo", "name": "Get repo", "method": "GET", "path": "/repos/{owner}/{repo}"}
            ]}}}"#,
        );
        let b = write_temp(
            r#"{"services": {"github": {"name": "GitHub2", "base_url": "https://api.github.com", "endpoints": [
                {"id": "repo2", "name": "Get repo2", "method": "GET", "path": "/repos/{owner}/{repo}"}
            ]}}}"#,
        );
        let loader = ConfigLoader::new(vec![a.path().to_path_buf(), b.path().to_path_buf()]);
        assert!(loader.load().is_err());
    }

    #[test]
    fn config_handle_swap_replaces_current() {
        let handle = ConfigHandle::new(McpFusionConfig::default());
        let mut next = McpFusionConfig::default();
        next.logging.include_location = true;
        handle.swap(next);
        assert!(handle.current().logging.include_location);
    }
}
