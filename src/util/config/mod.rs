//! chainrun configuration
//!
//! # Lookup order
//!
//! ```text
//! Priority (high → low):
//! 1. CLI `--config <FILE>`
//! 2. CHAINRUN_CONFIG environment variable
//! 3. User-level (~/.config/chainrun/config.toml)
//! 4. Default values
//! ```
//!
//! A missing file is not an error; every section and field falls back to its
//! default.
//!
//! # Usage
//!
//! ```rust
//! use chainrun::util::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_toml_str("[sync]\npoll_interval_ms = 5\n").unwrap();
//! assert_eq!(config.sync.poll_interval_ms, 5);
//! assert_eq!(config.log.level, "info");
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CHAINRUN_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeConfig {
    /// Runner settings
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Synchronization primitive settings
    #[serde(default)]
    pub sync: SyncConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RunnerConfig {
    /// Fixed runner name instead of the generated `current-thread-N`
    #[serde(default)]
    pub name: Option<String>,
}

/// Synchronization primitive configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// How often a blocked `wait()` re-checks without a notification
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    10
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// One of `debug`, `info`, `warn`, `error`
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl RuntimeConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::ParseError)
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("chainrun"));
    }

    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("chainrun"));
    }

    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("chainrun"));
    }

    None
}

/// Resolve the config file path: `CHAINRUN_CONFIG`, then the user config dir.
pub fn get_config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(explicit));
    }
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load configuration from the default location.
/// Returns defaults if no file exists.
pub fn load_config() -> Result<RuntimeConfig, ConfigError> {
    match get_config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(RuntimeConfig::default()),
    }
}

/// Load configuration from `path`. Returns defaults if it doesn't exist.
pub fn load_config_from(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    if !path.exists() {
        return Ok(RuntimeConfig::default());
    }

    let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
    RuntimeConfig::from_toml_str(&content)
}

/// Save configuration to `path`, creating parent directories.
pub fn save_config_to(
    config: &RuntimeConfig,
    path: &Path,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(ConfigError::IoError)?;
        }
    }

    let content = config.to_toml_string()?;
    fs::write(path, content).map_err(ConfigError::IoError)?;

    Ok(())
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),

    #[error("Config parse error: {0}")]
    ParseError(toml::de::Error),

    #[error("Config serialize error: {0}")]
    SerializeError(toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.sync.poll_interval_ms, 10);
        assert_eq!(config.runner.name, None);
    }

    #[test]
    fn test_partial_section() {
        let config = RuntimeConfig::from_toml_str("[runner]\nname = \"ui\"\n").unwrap();
        assert_eq!(config.runner.name.as_deref(), Some("ui"));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_error() {
        let err = RuntimeConfig::from_toml_str("[sync]\npoll_interval_ms = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = RuntimeConfig::default();
        config.log.level = "debug".to_string();
        config.sync.poll_interval_ms = 3;
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, RuntimeConfig::default());
    }
}
