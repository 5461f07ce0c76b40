//! HTTP request handlers.

use crate::server::response::{
    Dependencies, DependencyHealth, DependencyStatus, HealthData, HealthStatus,
};
use crate::server::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Version string for the application.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Path probed on the API to check reachability.
const PROBE_PATH: &str = "/";

/// Health check handler.
///
/// GET /api/health
///
/// Always answers 200; a reachability problem or an open circuit shows up as
/// `status: degraded` in the body.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let data = check_health(&state).await;

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")],
        Json(data),
    )
}

async fn check_health(state: &AppState) -> HealthData {
    let mut status = HealthStatus::Ok;
    let probe = state.client.get(PROBE_PATH).await;

    let api = if probe.is_transport_failure() {
        warn!(
            status_code = probe.status_code,
            error = probe.error.as_deref().unwrap_or_default(),
            "API dependency unreachable"
        );
        status = HealthStatus::Degraded;
        DependencyHealth {
            status: DependencyStatus::Down,
            url: state.api_url().to_string(),
            details: Some(probe.error.unwrap_or_else(|| "Unknown error".to_string())),
        }
    } else if probe.is_server_error() {
        DependencyHealth {
            status: DependencyStatus::Ok,
            url: state.api_url().to_string(),
            details: Some(format!("API returned {} (server error)", probe.status_code)),
        }
    } else {
        debug!(status_code = probe.status_code, "API dependency reachable");
        DependencyHealth {
            status: DependencyStatus::Ok,
            url: state.api_url().to_string(),
            details: None,
        }
    };

    let snapshot = state.client.circuit_breaker_status();
    if state.client.has_open_circuit() {
        status = HealthStatus::Degraded;
    }

    HealthData {
        status,
        timestamp: Utc::now(),
        service: state.service_name.clone(),
        version: VERSION.to_string(),
        dependencies: Dependencies { api },
        circuit_breaker: (!snapshot.is_empty()).then_some(snapshot),
    }
}
