//! Marketplace listing endpoints, including multipart image upload

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::repos::{
    ImageRepo, Item, ItemDetails, ItemFilter, ItemImage, ItemListing, ItemRepo, NewItemImage,
    UserRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidId};
use crate::http::server::AppState;
use crate::models::fields::MAX_DESCRIPTION_LEN;
use crate::models::{lenient, required_text, ValidationError};
use crate::realtime::EventKind;

/// Request body cap for image uploads
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Create/update payload; also the `itemData` part of a multipart upload
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    #[serde(flatten)]
    pub details: ItemDetails,
}

impl ItemRequest {
    fn listing(&self) -> Result<ItemListing, ValidationError> {
        Ok(ItemListing {
            title: required_text("title", self.title.as_deref(), Some(255))?,
            description: required_text(
                "description",
                self.description.as_deref(),
                Some(MAX_DESCRIPTION_LEN),
            )?,
            category: required_text("category", self.category.as_deref(), Some(100))?,
            condition: required_text("condition", self.condition.as_deref(), Some(100))?,
        })
    }
}

/// Listing with its images
#[derive(Serialize)]
pub struct ItemResponse {
    #[serde(flatten)]
    pub item: Item,
    pub images: Vec<ItemImage>,
}

/// A file part held in memory until the item exists
struct PendingImage {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

async fn with_images(state: &AppState, items: Vec<Item>) -> Result<Vec<ItemResponse>, ApiError> {
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let mut by_item: HashMap<i64, Vec<ItemImage>> = HashMap::new();
    for image in ImageRepo::new(&state.pool).list_for_items(&ids).await? {
        by_item.entry(image.item_id).or_default().push(image);
    }

    Ok(items
        .into_iter()
        .map(|item| ItemResponse {
            images: by_item.remove(&item.id).unwrap_or_default(),
            item,
        })
        .collect())
}

async fn list_filtered(
    state: &AppState,
    filter: ItemFilter<'_>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = ItemRepo::new(&state.pool).list(filter).await?;
    Ok(Json(with_images(state, items).await?))
}

/// GET /api/items
async fn list_items(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    list_filtered(&state, ItemFilter::All).await
}

/// GET /api/items/category/{category}
async fn items_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    list_filtered(&state, ItemFilter::Category(&category)).await
}

/// GET /api/items/condition/{condition}
async fn items_by_condition(
    State(state): State<Arc<AppState>>,
    Path(condition): Path<String>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    list_filtered(&state, ItemFilter::Condition(&condition)).await
}

/// GET /api/items/user/{userId}
async fn items_by_owner(
    State(state): State<Arc<AppState>>,
    ValidId(user_id): ValidId,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    list_filtered(&state, ItemFilter::Owner(user_id)).await
}

/// GET /api/items/{id}
async fn get_item(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = ItemRepo::new(&state.pool).get(id).await?;
    let images = ImageRepo::new(&state.pool).list_for_item(id).await?;
    Ok(Json(ItemResponse { item, images }))
}

/// Validate the payload and resolve the owner, in that order.
async fn prepare(state: &AppState, req: &ItemRequest) -> Result<(i64, ItemListing), ApiError> {
    let user_id = req
        .user_id
        .ok_or_else(|| ApiError::bad_request("Missing userId"))?;
    let listing = req.listing()?;

    if UserRepo::new(&state.pool).find(user_id).await?.is_none() {
        return Err(ApiError::bad_request("User not found"));
    }
    Ok((user_id, listing))
}

/// POST /api/items
async fn create_item(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let (owner_id, listing) = prepare(&state, &req).await?;
    let item = ItemRepo::new(&state.pool)
        .create(owner_id, &listing, &req.details)
        .await?;

    tracing::info!(item_id = item.id, owner_id, "item created");
    let response = ItemResponse {
        item,
        images: Vec::new(),
    };
    state.notify(EventKind::Item, &response).await;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/items/create-with-images
///
/// Parts: `itemData` (JSON), `userId`, and any number of `images`.
async fn create_with_images(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let mut req: Option<ItemRequest> = None;
    let mut user_id: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        match field.name() {
            Some("itemData") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| ApiError::bad_request(format!("invalid itemData: {e}")))?;
                req = Some(parsed);
            }
            Some("userId") => {
                user_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.body_text()))?,
                );
            }
            Some("images") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                if !bytes.is_empty() {
                    files.push(PendingImage {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            other => tracing::debug!(field = ?other, "ignoring multipart field"),
        }
    }

    let mut req = req.ok_or(ValidationError::Missing { field: "itemData" })?;
    if let Some(raw) = user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = raw.parse().map_err(|_| ValidationError::InvalidFormat {
            field: "userId",
            reason: "must be an integer",
        })?;
        req.user_id = Some(parsed);
    }

    let (owner_id, listing) = prepare(&state, &req).await?;
    let item = ItemRepo::new(&state.pool)
        .create(owner_id, &listing, &req.details)
        .await?;

    let images = store_images(&state, item.id, files).await;
    tracing::info!(item_id = item.id, images = images.len(), "item created with images");

    let response = ItemResponse { item, images };
    state.notify(EventKind::Item, &response).await;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Save files and their metadata. A failed file is logged and skipped;
/// the first one saved is primary.
async fn store_images(state: &AppState, item_id: i64, files: Vec<PendingImage>) -> Vec<ItemImage> {
    let repo = ImageRepo::new(&state.pool);
    let mut saved = Vec::with_capacity(files.len());

    for file in files {
        let stored = match state.uploads.save(Some(&file.file_name), &file.bytes).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(item_id, file = %file.file_name, error = %e, "failed to store image");
                continue;
            }
        };

        let image = NewItemImage {
            item_id,
            file_name: file.file_name,
            file_path: stored.path.display().to_string(),
            image_url: stored.url,
            file_size: stored.size,
            file_type: file.content_type,
            is_primary: saved.is_empty(),
        };
        match repo.create(&image).await {
            Ok(image) => saved.push(image),
            Err(e) => {
                tracing::error!(item_id, error = %e, "failed to record image");
                state.uploads.remove(&stored.path).await;
            }
        }
    }
    saved
}

/// PUT /api/items/{id}
async fn update_item(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    JsonBody(req): JsonBody<ItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let listing = req.listing()?;
    let item = ItemRepo::new(&state.pool)
        .update(id, &listing, req.details.asking_price)
        .await?;
    let images = ImageRepo::new(&state.pool).list_for_item(id).await?;

    let response = ItemResponse { item, images };
    state.notify(EventKind::Item, &response).await;
    Ok(Json(response))
}

/// DELETE /api/items/{id}
async fn delete_item(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<StatusCode, ApiError> {
    // Rows cascade with the item; the files do not
    let images = ImageRepo::new(&state.pool).list_for_item(id).await?;
    ItemRepo::new(&state.pool).delete(id).await?;
    for image in &images {
        state.uploads.remove(std::path::Path::new(&image.file_path)).await;
    }
    tracing::info!(item_id = id, images = images.len(), "item deleted");
    state.notify(EventKind::Item, &json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Item routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/items", get(list_items).post(create_item))
        .route(
            "/api/items/create-with-images",
            post(create_with_images).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/items/category/{category}", get(items_by_category))
        .route("/api/items/condition/{condition}", get(items_by_condition))
        .route("/api/items/user/{userId}", get(items_by_owner))
        .route(
            "/api/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::testing::send;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    #[test]
    fn request_reads_lenient_numbers_alongside_listing() {
        let req: ItemRequest = serde_json::from_value(json!({
            "userId": "5",
            "title": "Bike",
            "description": "Hybrid bike",
            "category": "sports",
            "condition": "used",
            "askingPrice": "3500",
            "quantity": 1
        }))
        .unwrap();

        assert_eq!(req.user_id, Some(5));
        assert_eq!(req.details.asking_price, Some(Decimal::from(3500)));
        assert_eq!(req.details.quantity, Some(1));
        assert_eq!(req.listing().unwrap().title, "Bike");
    }

    #[test]
    fn listing_requires_condition() {
        let req = ItemRequest {
            title: Some("Bike".into()),
            description: Some("Hybrid".into()),
            category: Some("sports".into()),
            ..ItemRequest::default()
        };
        assert_eq!(
            req.listing().unwrap_err(),
            ValidationError::Missing { field: "condition" }
        );
    }

    #[tokio::test]
    async fn create_without_user_id_is_rejected() {
        let (status, body) = send(
            Method::POST,
            "/api/items",
            Some(json!({ "title": "Bike", "description": "d", "category": "c", "condition": "new" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing userId");
    }

    #[tokio::test]
    async fn unparseable_price_is_rejected() {
        let (status, _) = send(
            Method::POST,
            "/api/items",
            Some(json!({ "userId": 1, "askingPrice": "cheap" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn multipart_without_item_data_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let app = crate::http::build_router(crate::http::server::tests::lazy_state(tmp.path()), false);

        let boundary = "XBOUNDARY";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"userId\"\r\n\r\n3\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/items/create-with-images")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["message"], "itemData is required");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn deleting_an_item_removes_its_image_files() {
        use crate::db::repos::NewUser;
        use recyconnect_core::domain::hash_password_with_cost;
        use recyconnect_core::AppConfig;

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::schema::run(&pool).await.unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.uploads.dir = tmp.path().join("items");
        let state = Arc::new(AppState::new(pool.clone(), &config));

        let owner = UserRepo::new(&pool)
            .create(NewUser {
                email: format!("seller-{}@test.edu", uuid::Uuid::new_v4()),
                password: hash_password_with_cost("pw", 4).unwrap(),
                role: "USER".into(),
                name: "Seller".into(),
                phone: None,
                college_id: uuid::Uuid::new_v4().to_string(),
                bio: None,
            })
            .await
            .unwrap();
        let listing = ItemListing {
            title: "Kettle".into(),
            description: "1.5L".into(),
            category: "appliances".into(),
            condition: "good".into(),
        };
        let item = ItemRepo::new(&pool)
            .create(owner.id, &listing, &ItemDetails::default())
            .await
            .unwrap();
        let images = store_images(
            &state,
            item.id,
            vec![PendingImage {
                file_name: "kettle.jpg".into(),
                content_type: "image/jpeg".into(),
                bytes: b"jpeg".to_vec(),
            }],
        )
        .await;
        let file = std::path::PathBuf::from(&images[0].file_path);
        assert!(file.exists());

        let app = crate::http::build_router(state, false);
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/items/{}", item.id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!file.exists());
        UserRepo::new(&pool).delete(owner.id).await.unwrap();
    }
}
