//! Error types and error handling for idcontrol.
//!
//! These errors cover construction, configuration and hosting. Request
//! execution never produces them: every outcome of a network call is folded
//! into a [`Response`](crate::client::Response) instead.

use thiserror::Error;

/// CLI exit codes.
pub mod exit_code {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// General error
    pub const GENERAL_ERROR: i32 = 1;
    /// Configuration error
    pub const CONFIG_ERROR: i32 = 2;
    /// The remote API answered with a failure-shaped response
    pub const REQUEST_FAILED: i32 = 3;
    /// Command line argument error
    pub const CLI_ERROR: i32 = 64;
}

/// The main error type for idcontrol.
#[derive(Debug, Error)]
pub enum IdControlError {
    /// Configuration file is invalid or cannot be loaded.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The API base URL is not an absolute URL.
    #[error("Invalid baseURL: {url}. Must be a valid URL.")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The hosting server or runtime failed.
    #[error("Server error: {message}")]
    Server {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IdControlError {
    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            IdControlError::Config { .. }
            | IdControlError::InvalidBaseUrl { .. }
            | IdControlError::Yaml(_) => exit_code::CONFIG_ERROR,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Creates a configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        IdControlError::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error with a message and source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        IdControlError::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a server error with a message.
    pub fn server(message: impl Into<String>) -> Self {
        IdControlError::Server {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a server error with a message and source.
    pub fn server_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        IdControlError::Server {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias for idcontrol operations.
pub type Result<T> = std::result::Result<T, IdControlError>;
