//! Direct message endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::repos::{Message, MessageFilter, MessageRepo, NewMessage};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidId};
use crate::http::server::AppState;
use crate::models::{lenient, required_text};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub sender_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub receiver_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub item_id: Option<i64>,
    pub content: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub item_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub sender_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub receiver_id: Option<i64>,
}

/// GET /api/messages?itemId=&senderId=&receiverId=
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let filter = MessageFilter::from_params(params.item_id, params.sender_id, params.receiver_id);
    Ok(Json(MessageRepo::new(&state.pool).list(filter).await?))
}

/// GET /api/messages/{id}
async fn get_message(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<Message>, ApiError> {
    Ok(Json(MessageRepo::new(&state.pool).get(id).await?))
}

/// POST /api/messages
async fn create_message(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let content = required_text("content", req.content.as_deref(), None)?;

    let message = MessageRepo::new(&state.pool)
        .create(&NewMessage {
            sender_id: req.sender_id,
            receiver_id: req.receiver_id,
            item_id: req.item_id,
            content,
        })
        .await?;

    tracing::debug!(message_id = message.id, item_id = ?message.item_id, "message sent");
    Ok((StatusCode::CREATED, Json(message)))
}

/// Message routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/messages", get(list_messages).post(create_message))
        .route("/api/messages/{id}", get(get_message))
}
