//! User account endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use recyconnect_core::domain::{generate_college_id, hash_password, non_blank, verify_password, UserRole};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::repos::{NewUser, User, UserChanges, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidId};
use crate::http::server::AppState;
use crate::models::{email, required_text};
use crate::realtime::EventKind;

/// User as returned by the API; never carries the password
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub phone: Option<String>,
    pub college_id: String,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            phone: u.phone,
            college_id: u.college_id,
            bio: u.bio,
            created_at: u.created_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub college_id: Option<String>,
    pub bio: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// bcrypt is CPU bound, so hashing runs on the blocking pool.
async fn hash_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("hash task failed: {e}")))?
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// An unreadable stored hash counts as a mismatch.
async fn verify_blocking(user_id: i64, password: String, stored: String) -> Result<bool, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::internal(format!("verify task failed: {e}")))?;
    Ok(outcome.unwrap_or_else(|e| {
        tracing::warn!(user_id, error = %e, "stored password hash unreadable");
        false
    }))
}

/// GET /api/users
async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = UserRepo::new(&state.pool).list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepo::new(&state.pool).get(id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /api/users
async fn create_user(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = email(req.email.as_deref())?;
    let password = required_text("password", req.password.as_deref(), None)?;
    let name = required_text("name", req.name.as_deref(), Some(255))?;

    let role = non_blank(req.role.as_deref())
        .map(|r| r.trim().to_ascii_uppercase())
        .unwrap_or_else(|| UserRole::default().as_str().to_string());
    let college_id = non_blank(req.college_id.as_deref())
        .map(|c| c.trim().to_string())
        .unwrap_or_else(generate_college_id);

    let password = hash_blocking(password).await?;
    let user = UserRepo::new(&state.pool)
        .create(NewUser {
            email,
            password,
            role,
            name: name.trim().to_string(),
            phone: req.phone,
            college_id,
            bio: req.bio,
        })
        .await?;

    tracing::info!(user_id = user.id, "user created");
    let response = UserResponse::from(user);
    state.notify(EventKind::User, &response).await;
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /api/users/{id} - partial profile update
async fn update_user(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let changes = UserChanges {
        name: req
            .name
            .as_deref()
            .map(|n| required_text("name", Some(n), Some(255)))
            .transpose()?,
        email: req.email.as_deref().map(|e| email(Some(e))).transpose()?,
        role: non_blank(req.role.as_deref()).map(|r| r.trim().to_ascii_uppercase()),
        phone: req.phone,
        bio: req.bio,
    };

    let user = UserRepo::new(&state.pool).update(id, changes).await?;
    let response = UserResponse::from(user);
    state.notify(EventKind::User, &response).await;
    Ok(Json(response))
}

/// DELETE /api/users/{id}
async fn delete_user(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<StatusCode, ApiError> {
    UserRepo::new(&state.pool).delete(id).await?;
    tracing::info!(user_id = id, "user deleted");
    state.notify(EventKind::User, &json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/users/login
async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(email), Some(password)) = (
        non_blank(req.email.as_deref()),
        non_blank(req.password.as_deref()),
    ) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let invalid = || ApiError::bad_request("Invalid email or password");
    let user = UserRepo::new(&state.pool)
        .find_by_email(email.trim())
        .await?
        .ok_or_else(invalid)?;

    let matches = verify_blocking(user.id, password.to_string(), user.password.clone()).await?;
    if !matches {
        return Err(invalid());
    }

    tracing::info!(user_id = user.id, "login succeeded");
    Ok(Json(LoginResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    }))
}

/// POST /api/users/{id}/change-password
async fn change_password(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    let new_password = required_text("newPassword", req.new_password.as_deref(), None)?;
    let repo = UserRepo::new(&state.pool);
    let user = repo.get(id).await?;

    let old_password = req.old_password.unwrap_or_default();
    let matches = verify_blocking(id, old_password, user.password).await?;
    if !matches {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Current password is incorrect" })),
        )
            .into_response());
    }

    let hashed = hash_blocking(new_password).await?;
    repo.set_password(id, &hashed).await?;
    tracing::info!(user_id = id, "password changed");
    Ok(Json(json!({ "message": "Password changed successfully" })).into_response())
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/login", post(login))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/{id}/change-password", post(change_password))
}
