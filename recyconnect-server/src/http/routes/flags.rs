//! Moderation flag endpoints

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use recyconnect_core::domain::moderation::{
    user_context, CONTENT_NOT_FOUND, UNKNOWN_CONTENT, UNKNOWN_ITEM, UNKNOWN_USER,
};
use recyconnect_core::domain::{non_blank, FlagStatus, FlagTarget, Severity};
use serde::Deserialize;
use serde_json::json;

use crate::db::repos::{
    DbError, DonatedRepo, Flag, FlagCounts, FlagQuery, FlagRepo, FlagUpdate, NewFlag,
    ReportedRepo, UserRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidId};
use crate::http::server::AppState;
use crate::models::fields::MAX_NOTES_LEN;
use crate::models::{bounded_text, lenient, ValidationError};
use crate::realtime::EventKind;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlagRequest {
    pub flag_type: Option<String>,
    pub reason: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub target_id: Option<i64>,
    pub target_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub flagged_by_user_id: Option<i64>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlagPatch {
    pub status: Option<String>,
    pub severity: Option<String>,
    pub admin_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub reviewed_by_admin_id: Option<i64>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<String>,
    pub flag_type: Option<String>,
    pub severity: Option<String>,
}

/// Parse an optional enum value, treating blank as absent.
fn parse_variant<T: FromStr>(field: &'static str, value: Option<&str>) -> Result<Option<T>, ValidationError> {
    non_blank(value)
        .map(|v| {
            v.parse().map_err(|_| ValidationError::InvalidVariant {
                field,
                value: v.to_string(),
            })
        })
        .transpose()
}

async fn lookup_context(state: &AppState, target_type: &str, target_id: i64) -> Result<String, DbError> {
    let context = match FlagTarget::classify(target_type) {
        FlagTarget::DonatedItem => DonatedRepo::new(&state.pool)
            .find(target_id)
            .await?
            .map(|item| item.title)
            .unwrap_or_else(|| UNKNOWN_ITEM.to_string()),
        FlagTarget::ReportedItem => ReportedRepo::new(&state.pool)
            .find(target_id)
            .await?
            .map(|item| item.title)
            .unwrap_or_else(|| UNKNOWN_ITEM.to_string()),
        FlagTarget::User => UserRepo::new(&state.pool)
            .find(target_id)
            .await?
            .map(|user| user_context(&user.name, &user.email))
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        FlagTarget::Other => UNKNOWN_CONTENT.to_string(),
    };
    Ok(context)
}

/// Human-readable description of what was flagged.
async fn flagged_content(state: &AppState, target_type: &str, target_id: i64) -> String {
    lookup_context(state, target_type, target_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(target_type, target_id, error = %e, "flag context lookup failed");
            CONTENT_NOT_FOUND.to_string()
        })
}

/// Numeric target id from a path segment.
fn parse_target_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("targetId: must be an integer"))
}

/// GET /api/flags?status=&flagType=&severity=
async fn list_flags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Flag>>, ApiError> {
    let status = parse_variant::<FlagStatus>("status", params.status.as_deref())?;
    let severity = parse_variant::<Severity>("severity", params.severity.as_deref())?;
    let query = FlagQuery::from_filters(status, non_blank(params.flag_type.as_deref()), severity);

    let flags = FlagRepo::new(&state.pool).list(&query).await?;
    tracing::debug!(?query, count = flags.len(), "listed flags");
    Ok(Json(flags))
}

/// GET /api/flags/{id}
async fn get_flag(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<Flag>, ApiError> {
    Ok(Json(FlagRepo::new(&state.pool).get(id).await?))
}

/// GET /api/flags/user/{userId}
async fn flags_by_user(
    State(state): State<Arc<AppState>>,
    ValidId(user_id): ValidId,
) -> Result<Json<Vec<Flag>>, ApiError> {
    Ok(Json(FlagRepo::new(&state.pool).list_by_flagger(user_id).await?))
}

/// GET /api/flags/target/{targetType}/{targetId}
async fn flags_for_target(
    State(state): State<Arc<AppState>>,
    Path((target_type, target_id)): Path<(String, String)>,
) -> Result<Json<Vec<Flag>>, ApiError> {
    let target_id = parse_target_id(&target_id)?;
    let flags = FlagRepo::new(&state.pool)
        .list_for_target(&target_type, target_id)
        .await?;
    Ok(Json(flags))
}

/// GET /api/flags/count/{targetType}/{targetId}
async fn count_for_target(
    State(state): State<Arc<AppState>>,
    Path((target_type, target_id)): Path<(String, String)>,
) -> Result<Json<FlagCounts>, ApiError> {
    let target_id = parse_target_id(&target_id)?;
    let counts = FlagRepo::new(&state.pool)
        .counts(&target_type, target_id)
        .await?;
    Ok(Json(counts))
}

/// POST /api/flags
async fn create_flag(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateFlagRequest>,
) -> Result<(StatusCode, Json<Flag>), ApiError> {
    let (Some(flag_type), Some(reason), Some(target_id), Some(target_type), Some(user_id)) = (
        non_blank(req.flag_type.as_deref()),
        non_blank(req.reason.as_deref()),
        req.target_id,
        non_blank(req.target_type.as_deref()),
        req.flagged_by_user_id,
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };
    let description = bounded_text("description", req.description.clone(), MAX_NOTES_LEN)?;
    let target_type = target_type.trim().to_string();

    if UserRepo::new(&state.pool).find(user_id).await?.is_none() {
        return Err(ApiError::bad_request("Invalid user ID"));
    }

    let repo = FlagRepo::new(&state.pool);
    if repo.exists_for(user_id, target_id, &target_type).await? {
        return Err(ApiError::bad_request(format!(
            "You have already flagged this {target_type}"
        )));
    }

    let reason = reason.trim().to_ascii_uppercase();
    let new_flag = NewFlag {
        flag_type: flag_type.trim().to_ascii_uppercase(),
        severity: Severity::from_reason(&reason),
        reason,
        description,
        target_id,
        flagged_content: flagged_content(&state, &target_type, target_id).await,
        target_type,
        flagged_by_user_id: user_id,
    };

    let flag = repo.create(&new_flag).await?;
    tracing::info!(
        flag_id = flag.id,
        target_type = %flag.target_type,
        target_id = flag.target_id,
        severity = %flag.severity,
        "flag created"
    );
    state.notify(EventKind::Flag, &flag).await;
    Ok((StatusCode::CREATED, Json(flag)))
}

/// PATCH /api/flags/{id} - admin review
async fn review_flag(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    JsonBody(patch): JsonBody<FlagPatch>,
) -> Result<Json<Flag>, ApiError> {
    let mut update = FlagUpdate {
        status: parse_variant("status", patch.status.as_deref())?,
        severity: parse_variant("severity", patch.severity.as_deref())?,
        admin_notes: bounded_text("adminNotes", patch.admin_notes, MAX_NOTES_LEN)?,
        reviewed_by_admin_id: None,
    };

    if let Some(admin_id) = patch.reviewed_by_admin_id {
        if UserRepo::new(&state.pool).find(admin_id).await?.is_some() {
            update.reviewed_by_admin_id = Some(admin_id);
        } else {
            tracing::warn!(flag_id = id, admin_id, "unknown reviewing admin ignored");
        }
    }

    let flag = FlagRepo::new(&state.pool).update(id, &update).await?;
    tracing::info!(flag_id = id, status = %flag.status, "flag reviewed");
    state.notify(EventKind::Flag, &flag).await;
    Ok(Json(flag))
}

/// DELETE /api/flags/{id}
async fn delete_flag(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<StatusCode, ApiError> {
    FlagRepo::new(&state.pool).delete(id).await?;
    tracing::info!(flag_id = id, "flag deleted");
    state.notify(EventKind::Flag, &json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Flag routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/flags", get(list_flags).post(create_flag))
        .route("/api/flags/user/{userId}", get(flags_by_user))
        .route(
            "/api/flags/target/{targetType}/{targetId}",
            get(flags_for_target),
        )
        .route(
            "/api/flags/count/{targetType}/{targetId}",
            get(count_for_target),
        )
        .route(
            "/api/flags/{id}",
            get(get_flag).patch(review_flag).delete(delete_flag),
        )
}
