//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Uploaded images served read-only
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use recyconnect_core::config::ServerSection;
use recyconnect_core::AppConfig;
use serde::Serialize;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::db::repos::StatsRepo;
use crate::realtime::{Broadcaster, EventKind, RealtimeEvent};
use crate::uploads::{ImageStore, PUBLIC_PREFIX};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    pub cors_permissive: bool,
}

impl From<&ServerSection> for ServerConfig {
    fn from(section: &ServerSection) -> Self {
        Self {
            bind_addr: section.bind,
            cors_permissive: section.cors_permissive,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_permissive: false,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Dashboard update channel
    pub events: Broadcaster,
    pub uploads: ImageStore,
    /// Owner of reports and concerns submitted without a known user
    pub fallback_user_id: i64,
}

impl AppState {
    pub fn new(pool: PgPool, config: &AppConfig) -> Self {
        Self {
            pool,
            events: Broadcaster::new(config.realtime.channel_capacity),
            uploads: ImageStore::new(&config.uploads.dir),
            fallback_user_id: config.defaults.fallback_user_id,
        }
    }

    /// Publish a write to dashboard subscribers, then refreshed stats.
    ///
    /// Stats failures are logged; the write already succeeded.
    pub async fn notify<T: Serialize>(&self, kind: EventKind, data: &T) {
        if self.events.subscriber_count() == 0 {
            tracing::debug!(kind = kind.as_str(), "no dashboard subscribers");
            return;
        }

        match serde_json::to_value(data) {
            Ok(value) => {
                self.events.send(RealtimeEvent::new(kind, value));
            }
            Err(e) => tracing::warn!(kind = kind.as_str(), error = %e, "unserializable event"),
        }

        match StatsRepo::new(&self.pool).dashboard().await {
            Ok(stats) => match serde_json::to_value(stats) {
                Ok(value) => {
                    self.events.send(RealtimeEvent::new(EventKind::Stats, value));
                }
                Err(e) => tracing::warn!(error = %e, "unserializable stats"),
            },
            Err(e) => tracing::warn!(error = %e, "failed to refresh dashboard stats"),
        }
    }
}

const LOCAL_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:8080",
];

/// Assemble every route with CORS, tracing and static uploads.
pub fn build_router(state: Arc<AppState>, cors_permissive: bool) -> Router {
    let cors = if cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(
                LOCAL_ORIGINS
                    .iter()
                    .map(|origin| HeaderValue::from_static(*origin))
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let uploads = ServeDir::new(state.uploads.dir());

    Router::new()
        .merge(routes::health::router())
        .merge(routes::users::router())
        .merge(routes::items::router())
        .merge(routes::donated::router())
        .merge(routes::reported::router())
        .merge(routes::concerns::router())
        .merge(routes::flags::router())
        .merge(routes::messages::router())
        .merge(routes::dashboard::router())
        .nest_service(PUBLIC_PREFIX, uploads)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until a shutdown signal arrives.
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    tracing::info!(uploads = %state.uploads.dir().display(), "Serving uploads");
    let app = build_router(Arc::new(state), config.cors_permissive);

    // Bind listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    // Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
