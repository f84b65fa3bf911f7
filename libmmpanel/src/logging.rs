//! Diagnostic log output for the panel binaries
//!
//! Settings come from the `[logging]` table of the panel config, then the
//! `MM_PANEL_LOG_FORMAT` / `MM_PANEL_LOG_LEVEL` variables. A set `RUST_LOG`
//! replaces the computed filter entirely.
//!
//! Logs always go to stderr: stdout carries command output and toasts are
//! printed to stderr as plain lines, so the default level is `warn`.
//!
//! ```no_run
//! use libmmpanel::Config;
//!
//! let config = Config::load().unwrap_or_default();
//! config.logging.with_env_overrides().init(false);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub const FORMAT_ENV: &str = "MM_PANEL_LOG_FORMAT";
pub const LEVEL_ENV: &str = "MM_PANEL_LOG_LEVEL";

/// Crates whose debug output `--verbose` turns on
const PANEL_TARGETS: [&str; 2] = ["libmmpanel", "mm_panel"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One human-readable line per event
    #[default]
    Text,
    /// One JSON object per line, for collecting logs off the device
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Valid options: text, json", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// The `[logging]` table of the panel config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive, e.g. `warn` or `libmmpanel::store=debug,warn`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Apply `MM_PANEL_LOG_FORMAT` and `MM_PANEL_LOG_LEVEL` on top of the file
    /// settings. An unparsable format is ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(format) = std::env::var(FORMAT_ENV).ok().and_then(|s| s.parse().ok()) {
            self.format = format;
        }
        if let Ok(level) = std::env::var(LEVEL_ENV) {
            if !level.trim().is_empty() {
                self.level = level.trim().to_string();
            }
        }
        self
    }

    /// Filter used when `RUST_LOG` is unset. Verbose raises the panel's
    /// own crates to debug and leaves dependencies at the configured level.
    pub fn filter_directive(&self, verbose: bool) -> String {
        if !verbose {
            return self.level.clone();
        }
        let mut directives: Vec<String> = PANEL_TARGETS
            .iter()
            .map(|target| format!("{}=debug", target))
            .collect();
        directives.push(self.level.clone());
        directives.join(",")
    }

    /// Install the global subscriber. Later calls are no-ops.
    pub fn init(&self, verbose: bool) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.filter_directive(verbose)));

        let result = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .without_time()
                .try_init(),
        };

        if let Err(e) = result {
            tracing::debug!("logging already initialized: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Text ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        // colored output makes no sense on an adb shell
        let err = "pretty".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("Invalid log format: 'pretty'"));
    }

    #[test]
    fn test_logging_table_from_toml() {
        let config: LoggingConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "warn");

        assert!(toml::from_str::<LoggingConfig>("format = \"yaml\"").is_err());
    }

    #[test]
    fn test_verbose_only_raises_panel_crates() {
        let config = LoggingConfig {
            format: LogFormat::Text,
            level: "error".to_string(),
        };
        assert_eq!(config.filter_directive(false), "error");
        assert_eq!(
            config.filter_directive(true),
            "libmmpanel=debug,mm_panel=debug,error"
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_settings() {
        std::env::set_var(FORMAT_ENV, "json");
        std::env::set_var(LEVEL_ENV, "info");
        let config = LoggingConfig::default().with_env_overrides();
        std::env::remove_var(FORMAT_ENV);
        std::env::remove_var(LEVEL_ENV);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }

    #[test]
    #[serial]
    fn test_bad_env_values_keep_file_settings() {
        std::env::set_var(FORMAT_ENV, "xml");
        std::env::set_var(LEVEL_ENV, "  ");
        let file = LoggingConfig {
            format: LogFormat::Json,
            level: "debug".to_string(),
        };
        let config = file.clone().with_env_overrides();
        std::env::remove_var(FORMAT_ENV);
        std::env::remove_var(LEVEL_ENV);

        assert_eq!(config, file);
    }

    #[test]
    fn test_double_init_does_not_panic() {
        LoggingConfig::default().init(false);
        LoggingConfig::default().init(true);
    }
}
