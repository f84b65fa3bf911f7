//! Error types for the panel

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PanelError>;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store already initialized")]
    AlreadyInitialized,
}

impl PanelError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PanelError::InvalidInput(_) => 3,
            PanelError::Command(_) => 2,
            PanelError::Config(_) => 1,
            PanelError::Storage(_) => 1,
            PanelError::AlreadyInitialized => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failures reported by the command executor or while decoding its output
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    #[error("Failed to spawn command: {0}")]
    Spawn(String),

    #[error("Command exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Unexpected command output: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Preference file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preference file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}
