//! Config loading from a TOML file, default-config setup, validation.

use std::fs;
use std::path::Path;

use thiserror::Error;

use super::model::MonitorConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0} (run with --setup to create one)")]
    NotFound(String),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl MonitorConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Err(ConfigError::NotFound(path.to_string()));
        }
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            source: e,
        })?;
        let config: MonitorConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path` (the `--setup` mode).
    pub fn save_default(path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let rendered = toml::to_string_pretty(&MonitorConfig::default())?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Validate configuration values once at load time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval == 0 {
            return Err(ConfigError::Invalid("check_interval must be > 0".into()));
        }
        if self.error_threshold == 0 {
            return Err(ConfigError::Invalid("error_threshold must be > 0".into()));
        }
        if self.context_settings.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "context_settings.buffer_size must be > 0".into(),
            ));
        }
        if self.context_settings.max_log_length == 0 {
            return Err(ConfigError::Invalid(
                "context_settings.max_log_length must be > 0".into(),
            ));
        }
        if self.ssh_settings.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "ssh_settings.pool_size must be > 0".into(),
            ));
        }
        for server in &self.remote_servers {
            if server.host.is_empty() {
                return Err(ConfigError::Invalid(
                    "remote_servers entry has an empty host".into(),
                ));
            }
            if server.username.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "remote server {} has an empty username",
                    server.label()
                )));
            }
            if server.password.is_none() && server.key_file.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "remote server {} needs a password or key_file",
                    server.label()
                )));
            }
        }
        Ok(())
    }
}
