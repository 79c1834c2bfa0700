//! Lost-and-found endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use recyconnect_core::domain::lost_found::initial_status;
use recyconnect_core::domain::{non_blank, ReportedStatusUpdate};
use serde::Deserialize;
use serde_json::json;

use crate::db::repos::{ReportDetails, ReportFields, ReportedItem, ReportedRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidId};
use crate::http::server::AppState;
use crate::models::fields::MAX_DESCRIPTION_LEN;
use crate::models::{lenient, required_text, ValidationError};
use crate::realtime::EventKind;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "item_type", alias = "itemType")]
    pub item_type: Option<String>,
    pub status: Option<String>,
    pub is_resolved: Option<bool>,
    #[serde(flatten)]
    pub details: ReportDetails,
}

impl ReportRequest {
    fn into_fields(self) -> Result<ReportFields, ValidationError> {
        Ok(ReportFields {
            title: required_text("title", self.title.as_deref(), Some(255))?,
            description: required_text(
                "description",
                self.description.as_deref(),
                Some(MAX_DESCRIPTION_LEN),
            )?,
            category: required_text("category", self.category.as_deref(), Some(100))?,
            item_type: required_text("item_type", self.item_type.as_deref(), Some(20))?
                .trim()
                .to_ascii_lowercase(),
            details: self.details,
        })
    }
}

#[derive(Deserialize)]
pub struct StatusPatch {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerParams {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub user_id: Option<i64>,
}

/// GET /api/reported?status=&category=
async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ReportedItem>>, ApiError> {
    let items = ReportedRepo::new(&state.pool)
        .list(
            non_blank(params.status.as_deref()),
            non_blank(params.category.as_deref()),
        )
        .await?;
    tracing::debug!(count = items.len(), "listed reports");
    Ok(Json(items))
}

/// GET /api/reported/my-reported?userId=
async fn my_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OwnerParams>,
) -> Result<Json<Vec<ReportedItem>>, ApiError> {
    let repo = ReportedRepo::new(&state.pool);
    let items = match params.user_id {
        Some(user_id) => repo.list_by_reporter(user_id).await?,
        None => repo.list(None, None).await?,
    };
    Ok(Json(items))
}

/// GET /api/reported/{id}
async fn get_report(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<ReportedItem>, ApiError> {
    Ok(Json(ReportedRepo::new(&state.pool).get(id).await?))
}

/// Reporter for a new report: the given user when known, else the
/// fallback account when it exists.
async fn resolve_reporter(state: &AppState, user_id: Option<i64>) -> Result<Option<i64>, ApiError> {
    let users = UserRepo::new(&state.pool);
    if let Some(id) = user_id {
        if users.find(id).await?.is_some() {
            return Ok(Some(id));
        }
        tracing::warn!(user_id = id, "unknown reporter, using fallback user");
    }

    if users.find(state.fallback_user_id).await?.is_some() {
        return Ok(Some(state.fallback_user_id));
    }
    tracing::warn!(
        fallback_user_id = state.fallback_user_id,
        "fallback user missing, report has no reporter"
    );
    Ok(None)
}

/// POST /api/reported
async fn create_report(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ReportRequest>,
) -> Result<(StatusCode, Json<ReportedItem>), ApiError> {
    let user_id = req.user_id;
    let status = initial_status(req.status.as_deref());
    let is_resolved = req.is_resolved.unwrap_or(false);
    let fields = req.into_fields()?;

    let reporter = resolve_reporter(&state, user_id).await?;
    let item = ReportedRepo::new(&state.pool)
        .create(&fields, &status, is_resolved, reporter)
        .await?;

    tracing::info!(reported_item_id = item.id, item_type = %item.item_type, "report created");
    state.notify(EventKind::ReportedItem, &item).await;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/reported/{id}
async fn replace_report(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    JsonBody(req): JsonBody<ReportRequest>,
) -> Result<Json<ReportedItem>, ApiError> {
    let status = non_blank(req.status.as_deref()).map(|s| s.trim().to_string());
    let is_resolved = req.is_resolved;
    let fields = req.into_fields()?;

    let item = ReportedRepo::new(&state.pool)
        .replace(id, &fields, status.as_deref(), is_resolved)
        .await?;
    state.notify(EventKind::ReportedItem, &item).await;
    Ok(Json(item))
}

/// PATCH /api/reported/{id} - `{status}` only
async fn patch_status(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    JsonBody(patch): JsonBody<StatusPatch>,
) -> Result<Json<ReportedItem>, ApiError> {
    let repo = ReportedRepo::new(&state.pool);
    let Some(requested) = non_blank(patch.status.as_deref()) else {
        return Ok(Json(repo.get(id).await?));
    };

    let update = ReportedStatusUpdate::from_requested(requested.trim());
    let item = repo.update_status(id, &update).await?;
    tracing::info!(reported_item_id = id, status = %update.status, "report status updated");
    state.notify(EventKind::ReportedItem, &item).await;
    Ok(Json(item))
}

/// DELETE /api/reported/{id}
async fn delete_report(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<StatusCode, ApiError> {
    ReportedRepo::new(&state.pool).delete(id).await?;
    tracing::info!(reported_item_id = id, "report deleted");
    state
        .notify(EventKind::ReportedItem, &json!({ "id": id }))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Lost-and-found routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reported", get(list_reports).post(create_report))
        .route("/api/reported/my-reported", get(my_reports))
        .route(
            "/api/reported/{id}",
            get(get_report)
                .put(replace_report)
                .patch(patch_status)
                .delete(delete_report),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::testing::send;
    use axum::http::Method;
    use chrono::NaiveDate;

    #[test]
    fn request_accepts_both_item_type_keys() {
        let req: ReportRequest = serde_json::from_value(json!({
            "title": "Keys",
            "description": "Bunch of three",
            "category": "keys",
            "item_type": "Found",
            "dateFound": "2025-01-02"
        }))
        .unwrap();
        let fields = req.into_fields().unwrap();
        assert_eq!(fields.item_type, "found");
        assert_eq!(fields.details.date_found, NaiveDate::from_ymd_opt(2025, 1, 2));

        let req: ReportRequest = serde_json::from_value(json!({ "itemType": "lost" })).unwrap();
        assert_eq!(req.item_type.as_deref(), Some("lost"));
    }

    #[test]
    fn missing_item_type_is_a_validation_error() {
        let req = ReportRequest {
            title: Some("Keys".into()),
            description: Some("d".into()),
            category: Some("keys".into()),
            ..ReportRequest::default()
        };
        assert_eq!(
            req.into_fields().unwrap_err(),
            ValidationError::Missing { field: "item_type" }
        );
    }

    #[tokio::test]
    async fn create_validates_before_database() {
        let (status, body) = send(
            Method::POST,
            "/api/reported",
            Some(json!({ "title": "Umbrella", "category": "misc", "item_type": "lost" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "description is required");
    }

    #[tokio::test]
    async fn bad_time_is_rejected() {
        let (status, _) = send(
            Method::POST,
            "/api/reported",
            Some(json!({ "timeLost": "half past five" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
