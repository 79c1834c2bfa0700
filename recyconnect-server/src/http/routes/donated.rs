//! Donation endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use recyconnect_core::domain::pickup_location;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::db::repos::{DonatedItem, DonatedRepo, DonationFields, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidId};
use crate::http::server::AppState;
use crate::models::fields::MAX_DESCRIPTION_LEN;
use crate::models::{lenient, required_text, ValidationError};
use crate::realtime::EventKind;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub estimated_value: Option<Decimal>,
    pub pickup_location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub claimed_by_id: Option<i64>,
    /// `{ "id": .. }` form of the claimant
    pub claimed_by: Option<UserRef>,
}

#[derive(Deserialize, Default)]
pub struct UserRef {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
}

impl DonationRequest {
    fn claimant(&self) -> Option<i64> {
        self.claimed_by_id
            .or_else(|| self.claimed_by.as_ref().and_then(|u| u.id))
    }

    fn fields(&self, pickup_location: String) -> Result<DonationFields, ValidationError> {
        Ok(DonationFields {
            title: required_text("title", self.title.as_deref(), Some(255))?,
            description: required_text(
                "description",
                self.description.as_deref(),
                Some(MAX_DESCRIPTION_LEN),
            )?,
            category: required_text("category", self.category.as_deref(), Some(100))?,
            condition: required_text("condition", self.condition.as_deref(), Some(100))?,
            estimated_value: self.estimated_value,
            pickup_location,
        })
    }
}

#[derive(Deserialize)]
pub struct CategoryParams {
    pub category: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerParams {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub user_id: Option<i64>,
}

/// GET /api/donated-items?category=
async fn list_donations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryParams>,
) -> Result<Json<Vec<DonatedItem>>, ApiError> {
    let items = DonatedRepo::new(&state.pool)
        .list(params.category.as_deref())
        .await?;
    tracing::debug!(count = items.len(), "listed donations");
    Ok(Json(items))
}

/// GET /api/donated-items/user?userId= - all donations when no user given
async fn donations_by_user(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OwnerParams>,
) -> Result<Json<Vec<DonatedItem>>, ApiError> {
    let repo = DonatedRepo::new(&state.pool);
    let items = match params.user_id {
        Some(user_id) => repo.list_by_donor(user_id).await?,
        None => repo.list(None).await?,
    };
    Ok(Json(items))
}

/// GET /api/donated-items/{id}
async fn get_donation(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<DonatedItem>, ApiError> {
    Ok(Json(DonatedRepo::new(&state.pool).get(id).await?))
}

/// POST /api/donated-items
async fn create_donation(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<DonationRequest>,
) -> Result<(StatusCode, Json<DonatedItem>), ApiError> {
    let donor_id = req
        .user_id
        .ok_or_else(|| ApiError::bad_request("Missing userId"))?;
    let location = required_text("pickupLocation", req.pickup_location.as_deref(), Some(255))?;
    let fields = req.fields(location)?;

    if UserRepo::new(&state.pool).find(donor_id).await?.is_none() {
        return Err(ApiError::bad_request("User not found"));
    }

    let item = DonatedRepo::new(&state.pool).create(donor_id, &fields).await?;
    tracing::info!(donated_item_id = item.id, donor_id, "donation created");
    state.notify(EventKind::DonatedItem, &item).await;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/donated-items/{id}
async fn update_donation(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    JsonBody(req): JsonBody<DonationRequest>,
) -> Result<Json<DonatedItem>, ApiError> {
    let repo = DonatedRepo::new(&state.pool);
    let existing = repo.get(id).await?;

    let location = pickup_location(
        req.pickup_location.as_deref(),
        Some(existing.pickup_location.as_str()),
    );
    let fields = req.fields(location)?;

    let item = repo.update(id, &fields, req.claimant()).await?;
    state.notify(EventKind::DonatedItem, &item).await;
    Ok(Json(item))
}

/// DELETE /api/donated-items/{id}
async fn delete_donation(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<StatusCode, ApiError> {
    DonatedRepo::new(&state.pool).delete(id).await?;
    tracing::info!(donated_item_id = id, "donation deleted");
    state
        .notify(EventKind::DonatedItem, &json!({ "id": id }))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Donation routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/donated-items",
            get(list_donations).post(create_donation),
        )
        .route("/api/donated-items/user", get(donations_by_user))
        .route(
            "/api/donated-items/{id}",
            get(get_donation)
                .put(update_donation)
                .delete(delete_donation),
        )
}
