use mcpfusion_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CommandError {
    #[error("failed to spawn command: {0}")]
    Spawn(String),
    #[error("failed waiting for command: {0}")]
    Wait(String),
    #[error("command configuration error: {0}")]
    Configuration(String),
}

impl From<CommandError> for CoreError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Configuration(msg) => CoreError::Configuration(msg),
            other => CoreError::Other(other.to_string()),
        }
    }
}
