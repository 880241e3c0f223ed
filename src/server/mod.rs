//! HTTP surface: the manager statistics endpoint plus a health probe.

pub mod api;
pub mod auth;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};

use crate::error::Result;
use crate::storage::Database;

pub use api::{ApiError, ApiResponse, AppState, SharedState};
pub use auth::ManagerSession;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            environment: api::PRODUCTION.to_string(),
        }
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/manager/stats", get(api::manager_stats))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    log::info!(
        "{method} {path} -> {} in {}ms",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Serve until Ctrl+C.
pub async fn serve(db: Database, config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::new(db, config.environment.clone()));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    log::info!(
        "Listening on http://{} ({} environment)",
        listener.local_addr()?,
        config.environment
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.environment, "production");
    }

    #[tokio::test]
    async fn test_expose_errors_follows_environment() {
        let db = Database::open_memory().await.unwrap();
        assert!(!AppState::new(db.clone(), "production").expose_errors());
        assert!(AppState::new(db, "development").expose_errors());
    }
}
