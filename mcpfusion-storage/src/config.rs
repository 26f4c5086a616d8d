//! Resolves the single embedded database file location: `MCP_FUSION_DB_DIR`,
//! else `/opt/mcpfusion` if writable, else `~/.mcpfusion`.

use std::path::{Path, PathBuf};

const DB_FILE_NAME: &str = "mcpfusion.db";
const SYSTEM_DIR: &str = "/opt/mcpfusion";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl StorageConfig {
    pub fn resolve() -> Self {
        let dir = std::env::var("MCP_FUSION_DB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_db_dir());
        Self {
            db_path: dir.join(DB_FILE_NAME),
        }
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: dir.into().join(DB_FILE_NAME),
        }
    }
}

fn default_db_dir() -> PathBuf {
    let system = Path::new(SYSTEM_DIR);
    if is_writable_dir(system) {
        return system.to_path_buf();
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mcpfusion")
}

fn is_writable_dir(dir: &Path) -> bool {
    if !dir.exists() {
        return std::fs::create_dir_all(dir).is_ok();
    }
    let probe = dir.join(".mcpfusion-write-probe");
    let writable = std::fs::write(&probe, b"").is_ok();
    let _ = std::fs::remove_file(&probe);
    writable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_appends_db_file_name() {
        let cfg = StorageConfig::at("/tmp/somewhere");
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/somewhere/mcpfusion.db"));
    }
}
