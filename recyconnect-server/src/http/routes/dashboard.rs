//! Admin dashboard: counters and the live update stream

use std::sync::Arc;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::db::repos::{DashboardStats, StatsRepo};
use crate::http::error::ApiError;
use crate::http::server::AppState;

/// GET /api/dashboard/stats
async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(StatsRepo::new(&state.pool).dashboard().await?))
}

/// GET /api/dashboard-updates - Server-Sent Events
async fn updates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::info!(
        subscribers = state.events.subscriber_count() + 1,
        "dashboard subscriber connected"
    );
    state.events.sse_response()
}

/// Dashboard routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard/stats", get(stats))
        .route("/api/dashboard-updates", get(updates))
}
