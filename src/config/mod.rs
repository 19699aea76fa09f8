//! Configuration management for mongoport
//!
//! Configuration is read from a TOML file and then overridden by command-line
//! arguments. Precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values
//!
//! The loaded [`Config`] is passed explicitly to the components that need it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::utils::validate::is_valid_connection_uri;

/// Upper bound accepted for `transfer.insert_retries`.
const MAX_INSERT_RETRIES: u32 = 10;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Transfer configuration
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Connection URI used when neither `--uri` nor a datasource is given
    #[serde(default = "default_uri")]
    pub default_uri: String,

    /// Server selection timeout in seconds; bounds `connect`
    #[serde(default = "default_server_selection_timeout")]
    pub server_selection_timeout: u64,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Name of the datasource used when none is requested
    #[serde(default)]
    pub default_datasource: Option<String>,

    /// Named connection URIs
    #[serde(default)]
    pub datasources: BTreeMap<String, String>,
}

/// Streaming transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Base directory under which exports are written
    #[serde(default = "default_export_directory")]
    pub export_directory: PathBuf,

    /// Extra attempts for a failed batch insert. Zero keeps fail-fast behavior.
    #[serde(default)]
    pub insert_retries: u32,

    /// Render a progress bar while transferring
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_server_selection_timeout() -> u64 {
    5
}

fn default_app_name() -> String {
    "mongoport".to_string()
}

fn default_export_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_show_progress() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            default_uri: default_uri(),
            server_selection_timeout: default_server_selection_timeout(),
            app_name: default_app_name(),
            default_datasource: None,
            datasources: BTreeMap::new(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            export_directory: default_export_directory(),
            insert_retries: 0,
            show_progress: default_show_progress(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file at the default location yields the default configuration;
    /// an explicitly requested file must exist.
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Default configuration file path (`~/.mongoport/config.toml`)
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mongoport")
            .join("config.toml")
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !is_valid_connection_uri(&self.connection.default_uri) {
            return Err(invalid("connection.default_uri", &self.connection.default_uri).into());
        }

        if self.connection.server_selection_timeout == 0 {
            return Err(invalid("connection.server_selection_timeout", "0").into());
        }

        if let Some(name) = &self.connection.default_datasource
            && !self.connection.datasources.contains_key(name)
        {
            return Err(invalid("connection.default_datasource", name).into());
        }

        if let Some((name, _)) = self
            .connection
            .datasources
            .iter()
            .find(|(_, uri)| !is_valid_connection_uri(uri))
        {
            return Err(invalid(&format!("connection.datasources.{name}"), "").into());
        }

        if self.transfer.insert_retries > MAX_INSERT_RETRIES {
            return Err(invalid(
                "transfer.insert_retries",
                &self.transfer.insert_retries.to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl ConnectionConfig {
    /// Server selection timeout as Duration
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_secs(self.server_selection_timeout)
    }

    /// Resolve a datasource URI by name, or the default datasource when `name` is None
    pub fn get_datasource(&self, name: Option<&str>) -> Option<String> {
        let name = name.or(self.default_datasource.as_deref())?;
        self.datasources.get(name).cloned()
    }

    /// Names of all configured datasources
    pub fn list_datasources(&self) -> Vec<String> {
        self.datasources.keys().cloned().collect()
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.default_uri, "mongodb://localhost:27017");
        assert_eq!(config.connection.server_selection_timeout(), Duration::from_secs(5));
        assert_eq!(config.transfer.insert_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [transfer]
            insert_retries = 2

            [connection.datasources]
            prod = "mongodb://prod:27017"
            "#,
        )
        .unwrap();

        assert_eq!(config.transfer.insert_retries, 2);
        assert!(config.transfer.show_progress);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(
            config.connection.get_datasource(Some("prod")).as_deref(),
            Some("mongodb://prod:27017")
        );
    }

    #[test]
    fn test_default_datasource_resolution() {
        let mut config = Config::default();
        config
            .connection
            .datasources
            .insert("local".into(), "mongodb://127.0.0.1".into());
        assert!(config.connection.get_datasource(None).is_none());

        config.connection.default_datasource = Some("local".into());
        assert_eq!(
            config.connection.get_datasource(None).as_deref(),
            Some("mongodb://127.0.0.1")
        );
        assert_eq!(config.connection.list_datasources(), vec!["local".to_string()]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.connection.server_selection_timeout = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.connection.default_datasource = Some("missing".into());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transfer.insert_retries = MAX_INSERT_RETRIES + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.connection.default_uri = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .connection
            .datasources
            .insert("legacy".into(), "localhost:27017".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[transfer\ninsert_retries = ").unwrap_err();
        assert!(err.to_string().contains("Invalid config format"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("mongoport-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let mut config = Config::default();
        config.transfer.insert_retries = 3;
        config.logging.level = LogLevel::Debug;
        config.save(&path).unwrap();

        let loaded = Config::load_from_file(Some(&path)).unwrap();
        assert_eq!(loaded.transfer.insert_retries, 3);
        assert_eq!(loaded.logging.level, LogLevel::Debug);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let path = std::env::temp_dir().join(format!("missing-{}.toml", uuid::Uuid::new_v4()));
        assert!(Config::load_from_file(Some(&path)).is_err());
    }
}
