//! Request engine configuration: timeouts, retry and circuit breaker policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URL used when neither the config file nor the environment names one.
pub const DEFAULT_API_BASE_URL: &str = "https://api.azvmotors.kz";

/// Request engine configuration.
///
/// Every field except `base_url` has a default. The base URL is validated
/// when an [`HttpClient`](crate::client::HttpClient) is constructed from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Absolute base URL that relative request paths are resolved against.
    pub base_url: String,

    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-attempt request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Base retry delay in milliseconds.
    pub retry_delay_ms: u64,

    /// Failures within the window before a circuit opens.
    pub circuit_breaker_threshold: u32,

    /// Rolling failure window in milliseconds.
    pub circuit_breaker_window_ms: u64,

    /// Time an open circuit waits before allowing a probe, in milliseconds.
    pub circuit_breaker_cooldown_ms: u64,
}

impl ClientConfig {
    /// Creates a configuration for `base_url` with default policy values.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout_ms: 3000,
            request_timeout_ms: 10000,
            max_retries: 3,
            retry_delay_ms: 200,
            circuit_breaker_threshold: 5,
            circuit_breaker_window_ms: 60000,
            circuit_breaker_cooldown_ms: 30000,
        }
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Sets the per-attempt request timeout.
    pub fn with_request_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base retry delay.
    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Sets the circuit breaker failure threshold.
    pub fn with_circuit_breaker_threshold(mut self, threshold: u32) -> Self {
        self.circuit_breaker_threshold = threshold;
        self
    }

    /// Sets the circuit breaker rolling window.
    pub fn with_circuit_breaker_window_ms(mut self, ms: u64) -> Self {
        self.circuit_breaker_window_ms = ms;
        self
    }

    /// Sets the circuit breaker cooldown.
    pub fn with_circuit_breaker_cooldown_ms(mut self, ms: u64) -> Self {
        self.circuit_breaker_cooldown_ms = ms;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn circuit_breaker_window(&self) -> Duration {
        Duration::from_millis(self.circuit_breaker_window_ms)
    }

    pub fn circuit_breaker_cooldown(&self) -> Duration {
        Duration::from_millis(self.circuit_breaker_cooldown_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.connect_timeout_ms, 3000);
        assert_eq!(config.request_timeout_ms, 10000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 200);
        assert_eq!(config.circuit_breaker_threshold, 5);
        assert_eq!(config.circuit_breaker_window_ms, 60000);
        assert_eq!(config.circuit_breaker_cooldown_ms, 30000);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::new("https://example.com")
            .with_max_retries(2)
            .with_retry_delay_ms(100)
            .with_request_timeout_ms(1)
            .with_circuit_breaker_cooldown_ms(50);

        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.request_timeout(), Duration::from_millis(1));
        assert_eq!(config.circuit_breaker_cooldown(), Duration::from_millis(50));
        assert_eq!(config.circuit_breaker_threshold, 5);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: ClientConfig =
            serde_yaml::from_str("base_url: \"https://example.com\"\nmax_retries: 1\n").unwrap();
        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.request_timeout_ms, 10000);
    }
}
