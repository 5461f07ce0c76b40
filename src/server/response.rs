//! Health endpoint response body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::client::CircuitSnapshot;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Reachability of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Ok,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyHealth {
    pub status: DependencyStatus,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependencies {
    pub api: DependencyHealth,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthData {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub version: String,
    pub dependencies: Dependencies,
    /// Breaker snapshot, present only when at least one key is tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<HashMap<String, CircuitSnapshot>>,
}
