//! Configuration module for idcontrol.
//!
//! This module provides all configuration types and loading functionality.
//! Configuration is loaded from a YAML file; the API base URL can be
//! overridden from the environment.

mod client;
mod logging;
mod server;

pub use client::{ClientConfig, DEFAULT_API_BASE_URL};
pub use logging::{LogFormat, LogLevel, LogOutput, LoggingConfig};
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::error::IdControlError;

/// Environment variable for the configuration file path.
pub const ENV_CONFIG_PATH: &str = "IDCONTROL_CONFIG";

/// Environment variable overriding `client.base_url`.
pub const ENV_API_BASE_URL: &str = "IDCONTROL_API_BASE_URL";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Health server configuration.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Request engine configuration.
    pub client: ClientConfig,
}

impl Config {
    /// Loads configuration from an optional path.
    /// If path is None, uses default search paths.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, IdControlError> {
        let mut config = match path {
            Some(p) => Self::read_path(p)?,
            None => {
                let default_paths = [
                    "/etc/idcontrol/config.yaml",
                    "/etc/idcontrol/config.yml",
                    "config.yaml",
                    "config.yml",
                ];

                match default_paths.iter().find(|p| Path::new(p).exists()) {
                    Some(p) => Self::read_path(p)?,
                    None => Self::default(),
                }
            }
        };

        config.apply_env_overrides(std::env::var(ENV_API_BASE_URL).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, IdControlError> {
        let config = Self::read_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML string.
    pub fn load_from_str(content: &str) -> Result<Self, IdControlError> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    fn read_path<P: AsRef<Path>>(path: P) -> Result<Self, IdControlError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            IdControlError::config_with_source(
                format!("Failed to read config file '{}'", path.as_ref().display()),
                e,
            )
        })?;

        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, IdControlError> {
        serde_yaml::from_str(content)
            .map_err(|e| IdControlError::config(format!("Failed to parse config: {}", e)))
    }

    /// Applies the base URL override, ignoring blank values.
    pub fn apply_env_overrides(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.client.base_url = url;
        }
    }

    /// Validates configuration.
    pub fn validate(&self) -> Result<(), IdControlError> {
        if self.server.port == 0 {
            return Err(IdControlError::config("server.port must be > 0"));
        }

        Url::parse(&self.client.base_url).map_err(|e| {
            IdControlError::config_with_source(
                format!("client.base_url must be a valid URL: {}", self.client.base_url),
                e,
            )
        })?;

        if self.client.request_timeout_ms == 0 {
            return Err(IdControlError::config(
                "client.request_timeout_ms must be > 0",
            ));
        }

        if self.client.circuit_breaker_threshold == 0 {
            return Err(IdControlError::config(
                "client.circuit_breaker_threshold must be > 0",
            ));
        }

        if self.logging.output == LogOutput::File && self.logging.file_path.is_none() {
            return Err(IdControlError::config(
                "logging.file_path is required when output is file",
            ));
        }

        Ok(())
    }
}
