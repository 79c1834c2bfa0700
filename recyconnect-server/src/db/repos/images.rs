//! Item image metadata

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::DbError;

/// Stored image attached to a listing
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemImage {
    pub id: i64,
    pub item_id: i64,
    /// Original client-side file name
    pub file_name: String,
    pub file_path: String,
    pub image_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct NewItemImage {
    pub item_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub image_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub is_primary: bool,
}

const IMAGE_COLUMNS: &str =
    "id, item_id, file_name, file_path, image_url, file_size, file_type, is_primary";

pub struct ImageRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ImageRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, image: &NewItemImage) -> Result<ItemImage, DbError> {
        let image = sqlx::query_as(&format!(
            r#"
            INSERT INTO item_images
                (item_id, file_name, file_path, image_url, file_size, file_type, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(image.item_id)
        .bind(&image.file_name)
        .bind(&image.file_path)
        .bind(&image.image_url)
        .bind(image.file_size)
        .bind(&image.file_type)
        .bind(image.is_primary)
        .fetch_one(self.pool)
        .await?;
        Ok(image)
    }

    /// Images of one item, primary first.
    pub async fn list_for_item(&self, item_id: i64) -> Result<Vec<ItemImage>, DbError> {
        let images = sqlx::query_as(&format!(
            "SELECT {IMAGE_COLUMNS} FROM item_images WHERE item_id = $1 ORDER BY is_primary DESC, id"
        ))
        .bind(item_id)
        .fetch_all(self.pool)
        .await?;
        Ok(images)
    }

    /// Images of many items in one query, for list endpoints.
    pub async fn list_for_items(&self, item_ids: &[i64]) -> Result<Vec<ItemImage>, DbError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let images = sqlx::query_as(&format!(
            r#"
            SELECT {IMAGE_COLUMNS} FROM item_images
            WHERE item_id = ANY($1)
            ORDER BY item_id, is_primary DESC, id
            "#
        ))
        .bind(item_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(images)
    }
}
