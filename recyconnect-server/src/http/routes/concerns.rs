//! User concern endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use recyconnect_core::domain::{non_blank, DEFAULT_CONCERN_STATUS, DEFAULT_CONTACT_METHOD};
use serde::Deserialize;
use serde_json::json;

use crate::db::repos::{ConcernDetails, ConcernRepo, UserConcern, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidId};
use crate::http::server::AppState;
use crate::models::fields::{MAX_CONCERN_LEN, MAX_NOTES_LEN};
use crate::models::{bounded_text, lenient, required_text};
use crate::realtime::EventKind;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConcernRequest {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub user_id: Option<i64>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub details: ConcernDetails,
}

impl ConcernRequest {
    /// Validated description and details.
    fn validate(self) -> Result<(String, ConcernDetails), ApiError> {
        let description =
            required_text("description", self.description.as_deref(), Some(MAX_CONCERN_LEN))?;
        let mut details = self.details;
        details.admin_response = bounded_text("adminResponse", details.admin_response, MAX_NOTES_LEN)?;
        Ok((description, details))
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub urgency: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerParams {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub user_id: Option<i64>,
}

/// Fill in the defaults a new concern gets.
fn with_defaults(mut details: ConcernDetails) -> ConcernDetails {
    if non_blank(details.contact_method.as_deref()).is_none() {
        details.contact_method = Some(DEFAULT_CONTACT_METHOD.to_string());
    }
    if non_blank(details.status.as_deref()).is_none() {
        details.status = Some(DEFAULT_CONCERN_STATUS.to_string());
    }
    details
}

/// GET /api/concerns?status=&urgency=
async fn list_concerns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<UserConcern>>, ApiError> {
    let concerns = ConcernRepo::new(&state.pool)
        .list(
            non_blank(params.status.as_deref()),
            non_blank(params.urgency.as_deref()),
        )
        .await?;
    Ok(Json(concerns))
}

/// GET /api/concerns/my-concerns?userId=
async fn my_concerns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OwnerParams>,
) -> Result<Json<Vec<UserConcern>>, ApiError> {
    let repo = ConcernRepo::new(&state.pool);
    let concerns = match params.user_id {
        Some(user_id) => repo.list_by_submitter(user_id).await?,
        None => repo.list(None, None).await?,
    };
    Ok(Json(concerns))
}

/// GET /api/concerns/{id}
async fn get_concern(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<UserConcern>, ApiError> {
    Ok(Json(ConcernRepo::new(&state.pool).get(id).await?))
}

/// POST /api/concerns
async fn create_concern(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ConcernRequest>,
) -> Result<(StatusCode, Json<UserConcern>), ApiError> {
    let user_id = req.user_id;
    let (description, details) = req.validate()?;
    let details = with_defaults(details);

    let submitter = match user_id {
        Some(id) => UserRepo::new(&state.pool).find(id).await?.map(|u| u.id),
        None => None,
    };
    let reported_by = submitter.unwrap_or_else(|| {
        tracing::warn!(
            user_id = ?user_id,
            fallback_user_id = state.fallback_user_id,
            "concern without a known user, crediting fallback user"
        );
        state.fallback_user_id
    });

    let concern = ConcernRepo::new(&state.pool)
        .create(&description, &details, Some(reported_by), submitter)
        .await?;

    tracing::info!(concern_id = concern.id, "concern submitted");
    state.notify(EventKind::Concern, &concern).await;
    Ok((StatusCode::CREATED, Json(concern)))
}

/// PUT /api/concerns/{id}
async fn replace_concern(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    JsonBody(req): JsonBody<ConcernRequest>,
) -> Result<Json<UserConcern>, ApiError> {
    let (description, details) = req.validate()?;
    let concern = ConcernRepo::new(&state.pool)
        .replace(id, &description, &details)
        .await?;
    state.notify(EventKind::Concern, &concern).await;
    Ok(Json(concern))
}

/// DELETE /api/concerns/{id}
async fn delete_concern(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<StatusCode, ApiError> {
    ConcernRepo::new(&state.pool).delete(id).await?;
    tracing::info!(concern_id = id, "concern deleted");
    state.notify(EventKind::Concern, &json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Concern routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/concerns", get(list_concerns).post(create_concern))
        .route("/api/concerns/my-concerns", get(my_concerns))
        .route(
            "/api/concerns/{id}",
            get(get_concern)
                .put(replace_concern)
                .delete(delete_concern),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::testing::send;
    use axum::http::Method;

    #[test]
    fn defaults_fill_blank_contact_and_status() {
        let details = with_defaults(ConcernDetails {
            contact_method: Some(" ".into()),
            ..ConcernDetails::default()
        });
        assert_eq!(details.contact_method.as_deref(), Some("email"));
        assert_eq!(details.status.as_deref(), Some("pending"));

        let details = with_defaults(ConcernDetails {
            contact_method: Some("phone".into()),
            status: Some("in_review".into()),
            ..ConcernDetails::default()
        });
        assert_eq!(details.contact_method.as_deref(), Some("phone"));
        assert_eq!(details.status.as_deref(), Some("in_review"));
    }

    #[test]
    fn overlong_description_is_rejected() {
        let req = ConcernRequest {
            description: Some("x".repeat(MAX_CONCERN_LEN + 1)),
            ..ConcernRequest::default()
        };
        assert!(req.validate().is_err());
    }

    #[tokio::test]
    async fn create_requires_description() {
        let (status, body) = send(
            Method::POST,
            "/api/concerns",
            Some(json!({ "concernType": "harassment", "urgency": "high" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "description is required");
    }
}
