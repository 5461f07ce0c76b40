//! Health server configuration.

use serde::{Deserialize, Serialize};

/// HTTP server configuration for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,

    /// Listen port.
    pub port: u16,

    /// Service name reported in health responses.
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            service_name: "azv-idcontrol".to_string(),
        }
    }
}
