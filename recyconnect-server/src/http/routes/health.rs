//! Health and connectivity checks

use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/test/health - used by the frontend to check the backend is up
async fn backend_health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "Backend is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /api/test/cors
async fn cors_check() -> Json<Value> {
    Json(json!({
        "cors": "working",
        "message": "CORS is configured correctly",
    }))
}

/// Health routes
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/test/health", get(backend_health))
        .route("/api/test/cors", get(cors_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::testing::send;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn health_returns_ok() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_endpoints_through_router() {
        let (status, body) = send(Method::GET, "/api/test/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["message"], "Backend is running");
        assert!(body["timestamp"].is_string());

        let (status, body) = send(Method::GET, "/api/test/cors", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cors"], "working");
    }
}
