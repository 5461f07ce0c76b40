//! Shared state for the health server.

use crate::client::HttpClient;
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Engine used for the dependency probe.
    pub client: Arc<HttpClient>,
    /// Name reported in health responses.
    pub service_name: String,
}

impl AppState {
    /// Creates the state with a fresh engine built from `config.client`.
    pub fn new(config: &Config) -> Result<Self> {
        let client = HttpClient::new(config.client.clone())?;
        Ok(Self::with_client(Arc::new(client), &config.server.service_name))
    }

    /// Creates the state around an existing engine.
    pub fn with_client(client: Arc<HttpClient>, service_name: impl Into<String>) -> Self {
        Self {
            client,
            service_name: service_name.into(),
        }
    }

    /// Base URL of the probed API.
    pub fn api_url(&self) -> &str {
        self.client.base_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdControlError;

    #[test]
    fn test_app_state_new() {
        let mut config = Config::default();
        config.client.base_url = "https://api.example.com".to_string();
        config.server.service_name = "test-service".to_string();

        let state = AppState::new(&config).unwrap();
        assert_eq!(state.service_name, "test-service");
        assert_eq!(state.api_url(), "https://api.example.com");
    }

    #[test]
    fn test_app_state_rejects_invalid_base_url() {
        let mut config = Config::default();
        config.client.base_url = "not a url".to_string();

        let err = AppState::new(&config).unwrap_err();
        assert!(matches!(err, IdControlError::InvalidBaseUrl { .. }));
    }
}
