//! HTTP Server module - health endpoint for container orchestration.

pub mod handlers;
pub mod response;
pub mod state;


use crate::config::Config;
use crate::error::{IdControlError, Result};
use axum::{routing::get, Router};
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Creates the router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the HTTP server and runs until it fails.
pub async fn serve(config: &Config) -> Result<()> {
    let state = Arc::new(AppState::new(config)?);
    let router = create_router(state);

    let addr = SocketAddr::new(
        config
            .server
            .bind
            .parse()
            .map_err(|e| IdControlError::config(format!("Invalid bind address: {}", e)))?,
        config.server.port,
    );

    info!(api = %config.client.base_url, "Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        IdControlError::server_with_source(format!("Failed to bind to {}: {}", addr, e), e)
    })?;

    axum::serve(listener, router)
        .await
        .map_err(|e| IdControlError::server_with_source(format!("HTTP server stopped: {}", e), e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_router() {
        let state = Arc::new(AppState::new(&Config::default()).unwrap());
        let _router = create_router(state);
    }

    #[tokio::test]
    async fn test_serve_rejects_bad_bind_address() {
        let mut config = Config::default();
        config.server.bind = "not-an-ip".to_string();

        let err = serve(&config).await.unwrap_err();
        assert!(err.to_string().contains("Invalid bind address"));
    }
}
