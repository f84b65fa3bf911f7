//! Configuration management for the panel itself
//!
//! These are the panel's own settings (where the mount tool keeps its files,
//! where preferences are stored). The mount tool's configuration is handled
//! by [`crate::mount_config`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Persisted mount configuration file
    pub config_path: String,
    /// The mount tool binary providing `scan --json` and `version`
    pub binary_path: String,
    /// Root directory holding installed modules
    pub modules_root: String,
    /// Module id of the mount tool itself, hidden from active mounts
    pub self_module_id: String,
    /// Shell used to run collaborator commands
    pub shell: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the panel preferences (language, theme, nav fix)
    pub preferences_path: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            config_path: "/data/adb/magic_mount/config.toml".to_string(),
            binary_path: "/data/adb/modules/magic_mount_rs/meta-mm".to_string(),
            modules_root: "/data/adb/modules".to_string(),
            self_module_id: "magic_mount_rs".to_string(),
            shell: "sh".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            preferences_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file yields the built-in defaults; a present but invalid
    /// file is an error.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!("no config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Resolve where preferences are persisted
    pub fn preferences_path(&self) -> Result<PathBuf> {
        match &self.storage.preferences_path {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).to_string())),
            None => Ok(resolve_data_path()?.join("preferences.json")),
        }
    }
}

/// Resolve the configuration file path under the XDG base directories
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("MM_PANEL_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("mm-panel").join("config.toml"))
}

/// Resolve the data directory path under the XDG base directories
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("mm-panel"))
}
