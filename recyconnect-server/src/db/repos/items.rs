//! Marketplace listing repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::DbError;
use crate::models::lenient;

/// Required descriptive fields of a listing
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ItemListing {
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
}

/// Optional listing attributes, shared by requests and records
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub usage_time: Option<i32>,
    #[serde(default)]
    pub usage_time_unit: Option<String>,
    #[serde(default)]
    pub warranty: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub original_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub asking_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub delivery: Option<String>,
    // Electronics
    #[serde(default)]
    pub battery_health: Option<String>,
    #[serde(default)]
    pub repairs: Option<String>,
    #[serde(default)]
    pub working_status: Option<String>,
    // Furniture
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub dimension_length: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub dimension_width: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub dimension_height: Option<i32>,
    #[serde(default)]
    pub dimension_unit: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
}

/// Listing record with the owner's display name
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub listing: ItemListing,
    pub verified: bool,
    pub owner_id: Option<i64>,
    pub seller_name: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub details: ItemDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Which listings to return
#[derive(Debug, Clone, Copy)]
pub enum ItemFilter<'f> {
    All,
    Category(&'f str),
    Condition(&'f str),
    Owner(i64),
}

const ITEM_SELECT: &str = r#"
    SELECT
        i.id, i.title, i.description, i.category, i.condition, i.verified,
        i.user_id AS owner_id, u.uname AS seller_name,
        i.usage_time, i.usage_time_unit, i.warranty, i.original_price, i.asking_price,
        i.quantity, i.pickup_location, i.delivery, i.battery_health, i.repairs,
        i.working_status, i.dimensions, i.dimension_length, i.dimension_width,
        i.dimension_height, i.dimension_unit, i.material, i.color, i.urgency,
        i.deadline, i.receipt, i.created_at, i.updated_at
    FROM items i
    LEFT JOIN users u ON u.id = i.user_id
"#;

/// Listing repository
pub struct ItemRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ItemRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: ItemFilter<'_>) -> Result<Vec<Item>, DbError> {
        let query = match filter {
            ItemFilter::All => format!("{ITEM_SELECT} ORDER BY i.created_at DESC"),
            ItemFilter::Category(_) => {
                format!("{ITEM_SELECT} WHERE i.category = $1 ORDER BY i.created_at DESC")
            }
            ItemFilter::Condition(_) => {
                format!("{ITEM_SELECT} WHERE i.condition = $1 ORDER BY i.created_at DESC")
            }
            ItemFilter::Owner(_) => {
                format!("{ITEM_SELECT} WHERE i.user_id = $1 ORDER BY i.created_at DESC")
            }
        };

        let builder = sqlx::query_as::<_, Item>(&query);
        let builder = match filter {
            ItemFilter::All => builder,
            ItemFilter::Category(v) | ItemFilter::Condition(v) => builder.bind(v),
            ItemFilter::Owner(id) => builder.bind(id),
        };

        Ok(builder.fetch_all(self.pool).await?)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Item>, DbError> {
        let item = sqlx::query_as(&format!("{ITEM_SELECT} WHERE i.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(item)
    }

    pub async fn get(&self, id: i64) -> Result<Item, DbError> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("item", id))
    }

    pub async fn create(
        &self,
        owner_id: i64,
        listing: &ItemListing,
        details: &ItemDetails,
    ) -> Result<Item, DbError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO items (
                title, description, category, condition, user_id,
                usage_time, usage_time_unit, warranty, original_price, asking_price,
                quantity, pickup_location, delivery, battery_health, repairs,
                working_status, dimensions, dimension_length, dimension_width,
                dimension_height, dimension_unit, material, color, urgency,
                deadline, receipt
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26
            )
            RETURNING id
            "#,
        )
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(&listing.category)
        .bind(&listing.condition)
        .bind(owner_id)
        .bind(details.usage_time)
        .bind(&details.usage_time_unit)
        .bind(&details.warranty)
        .bind(details.original_price)
        .bind(details.asking_price)
        .bind(details.quantity)
        .bind(&details.pickup_location)
        .bind(&details.delivery)
        .bind(&details.battery_health)
        .bind(&details.repairs)
        .bind(&details.working_status)
        .bind(&details.dimensions)
        .bind(details.dimension_length)
        .bind(details.dimension_width)
        .bind(details.dimension_height)
        .bind(&details.dimension_unit)
        .bind(&details.material)
        .bind(&details.color)
        .bind(&details.urgency)
        .bind(&details.deadline)
        .bind(&details.receipt)
        .fetch_one(self.pool)
        .await?;

        self.get(id).await
    }

    /// Replace the editable fields; owner and timestamps are kept.
    pub async fn update(
        &self,
        id: i64,
        listing: &ItemListing,
        asking_price: Option<Decimal>,
    ) -> Result<Item, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE items SET
                title = $2, description = $3, category = $4, condition = $5,
                asking_price = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(&listing.category)
        .bind(&listing.condition)
        .bind(asking_price)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("item", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("item", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_accept_form_strings() {
        let details: ItemDetails = serde_json::from_str(
            r#"{
                "usageTime": "6",
                "usageTimeUnit": "months",
                "askingPrice": "1200.00",
                "quantity": "",
                "dimensionLength": 40,
                "color": "black"
            }"#,
        )
        .unwrap();

        assert_eq!(details.usage_time, Some(6));
        assert_eq!(details.asking_price, Some(Decimal::new(120000, 2)));
        assert_eq!(details.quantity, None);
        assert_eq!(details.dimension_length, Some(40));
        assert_eq!(details.color.as_deref(), Some("black"));
    }

    #[test]
    fn item_serializes_flat() {
        let item = Item {
            id: 9,
            listing: ItemListing {
                title: "Desk".into(),
                description: "Oak desk".into(),
                category: "furniture".into(),
                condition: "good".into(),
            },
            verified: false,
            owner_id: Some(3),
            seller_name: Some("Ravi".into()),
            details: ItemDetails::default(),
            created_at: Utc::now(),
            updated_at: None,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["title"], "Desk");
        assert_eq!(json["ownerId"], 3);
        assert_eq!(json["sellerName"], "Ravi");
        assert!(json.get("listing").is_none());
        assert!(json["askingPrice"].is_null());
    }
}
