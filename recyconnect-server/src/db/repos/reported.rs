//! Lost-and-found report repository

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use recyconnect_core::domain::ReportedStatusUpdate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::DbError;
use crate::models::lenient;

/// Optional report attributes, shared by requests and records
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetails {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub location_lost: Option<String>,
    #[serde(default)]
    pub location_found: Option<String>,
    #[serde(default)]
    pub current_location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date_lost: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date_found: Option<NaiveDate>,
    #[serde(default, with = "lenient::hm_time")]
    pub time_lost: Option<NaiveTime>,
    #[serde(default, with = "lenient::hm_time")]
    pub time_found: Option<NaiveTime>,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Validated required fields of a report
#[derive(Debug, Clone)]
pub struct ReportFields {
    pub title: String,
    pub description: String,
    pub category: String,
    /// `lost` or `found`
    pub item_type: String,
    pub details: ReportDetails,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "item_type")]
    pub item_type: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub details: ReportDetails,
    pub status: String,
    pub is_resolved: Option<bool>,
    pub reported_date: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Reporter
    pub user_id: Option<i64>,
    pub reporter_name: Option<String>,
}

const REPORTED_SELECT: &str = r#"
    SELECT
        r.id, r.title, r.description, r.category, r.item_type,
        r.color, r.brand, r.location_lost, r.location_found, r.current_location,
        r.date_lost, r.date_found, r.time_lost, r.time_found, r.contact_info, r.image,
        r.status, r.is_resolved, r.created_at AS reported_date, r.updated_at,
        r.user_id, u.uname AS reporter_name
    FROM reported_items r
    LEFT JOIN users u ON u.id = r.user_id
"#;

pub struct ReportedRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportedRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reports matching every given filter, newest first.
    pub async fn list(
        &self,
        status: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<ReportedItem>, DbError> {
        let items = sqlx::query_as(&format!(
            r#"
            {REPORTED_SELECT}
            WHERE ($1::TEXT IS NULL OR r.status = $1)
              AND ($2::TEXT IS NULL OR r.category = $2)
            ORDER BY r.created_at DESC
            "#
        ))
        .bind(status)
        .bind(category)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    pub async fn list_by_reporter(&self, user_id: i64) -> Result<Vec<ReportedItem>, DbError> {
        let items = sqlx::query_as(&format!(
            "{REPORTED_SELECT} WHERE r.user_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    pub async fn find(&self, id: i64) -> Result<Option<ReportedItem>, DbError> {
        let item = sqlx::query_as(&format!("{REPORTED_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(item)
    }

    pub async fn get(&self, id: i64) -> Result<ReportedItem, DbError> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("reported item", id))
    }

    pub async fn create(
        &self,
        fields: &ReportFields,
        status: &str,
        is_resolved: bool,
        reporter_id: Option<i64>,
    ) -> Result<ReportedItem, DbError> {
        let d = &fields.details;
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO reported_items (
                title, description, category, item_type, color, brand,
                location_lost, location_found, current_location,
                date_lost, date_found, time_lost, time_found, contact_info, image,
                status, is_resolved, user_id, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, NOW())
            RETURNING id
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.category)
        .bind(&fields.item_type)
        .bind(&d.color)
        .bind(&d.brand)
        .bind(&d.location_lost)
        .bind(&d.location_found)
        .bind(&d.current_location)
        .bind(d.date_lost)
        .bind(d.date_found)
        .bind(d.time_lost)
        .bind(d.time_found)
        .bind(&d.contact_info)
        .bind(&d.image)
        .bind(status)
        .bind(is_resolved)
        .bind(reporter_id)
        .fetch_one(self.pool)
        .await?;

        self.get(id).await
    }

    /// Full replacement of the editable fields. `None` status or resolution
    /// keeps the stored value.
    pub async fn replace(
        &self,
        id: i64,
        fields: &ReportFields,
        status: Option<&str>,
        is_resolved: Option<bool>,
    ) -> Result<ReportedItem, DbError> {
        let d = &fields.details;
        let result = sqlx::query(
            r#"
            UPDATE reported_items SET
                title = $2, description = $3, category = $4, item_type = $5,
                color = $6, brand = $7, location_lost = $8, location_found = $9,
                current_location = $10, date_lost = $11, date_found = $12,
                time_lost = $13, time_found = $14, contact_info = $15, image = $16,
                status = COALESCE($17, status),
                is_resolved = COALESCE($18, is_resolved),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.category)
        .bind(&fields.item_type)
        .bind(&d.color)
        .bind(&d.brand)
        .bind(&d.location_lost)
        .bind(&d.location_found)
        .bind(&d.current_location)
        .bind(d.date_lost)
        .bind(d.date_found)
        .bind(d.time_lost)
        .bind(d.time_found)
        .bind(&d.contact_info)
        .bind(&d.image)
        .bind(status)
        .bind(is_resolved)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("reported item", id));
        }
        self.get(id).await
    }

    /// Apply a mapped status change in a single statement.
    pub async fn update_status(
        &self,
        id: i64,
        update: &ReportedStatusUpdate,
    ) -> Result<ReportedItem, DbError> {
        let result = sqlx::query(
            "UPDATE reported_items SET status = $2, is_resolved = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&update.status)
        .bind(update.is_resolved)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("reported item", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM reported_items WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("reported item", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_parse_form_dates_and_times() {
        let details: ReportDetails = serde_json::from_str(
            r#"{
                "dateLost": "2025-03-14",
                "timeLost": "18:45",
                "dateFound": "",
                "locationLost": "Library"
            }"#,
        )
        .unwrap();

        assert_eq!(details.date_lost, NaiveDate::from_ymd_opt(2025, 3, 14));
        assert_eq!(details.time_lost, NaiveTime::from_hms_opt(18, 45, 0));
        assert_eq!(details.date_found, None);
        assert_eq!(details.location_lost.as_deref(), Some("Library"));
    }

    #[test]
    fn record_uses_snake_case_item_type_key() {
        let item = ReportedItem {
            id: 1,
            title: "Wallet".into(),
            description: "Brown leather".into(),
            category: "accessories".into(),
            item_type: "lost".into(),
            details: ReportDetails {
                time_lost: NaiveTime::from_hms_opt(9, 5, 0),
                ..ReportDetails::default()
            },
            status: "active".into(),
            is_resolved: Some(false),
            reported_date: Utc::now(),
            updated_at: None,
            user_id: Some(2),
            reporter_name: None,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["item_type"], "lost");
        assert!(json.get("itemType").is_none());
        assert_eq!(json["timeLost"], "09:05");
        assert_eq!(json["isResolved"], false);
        assert_eq!(json["userId"], 2);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn requested_status_maps_on_update() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::schema::run(&pool).await.unwrap();
        let repo = ReportedRepo::new(&pool);

        let fields = ReportFields {
            title: "Blue umbrella".into(),
            description: "Left in lecture hall B".into(),
            category: "accessories".into(),
            item_type: "lost".into(),
            details: ReportDetails::default(),
        };
        let created = repo.create(&fields, "pending", false, None).await.unwrap();
        assert!(created.updated_at.is_some());

        let verified = repo
            .update_status(created.id, &ReportedStatusUpdate::from_requested("verified"))
            .await
            .unwrap();
        assert_eq!(verified.status, "active");
        assert_eq!(verified.is_resolved, Some(false));

        let resolved = repo
            .update_status(created.id, &ReportedStatusUpdate::from_requested("resolved"))
            .await
            .unwrap();
        assert_eq!(resolved.status, "resolved");
        assert_eq!(resolved.is_resolved, Some(true));
        assert!(resolved.updated_at >= verified.updated_at);

        let reopened = repo
            .update_status(created.id, &ReportedStatusUpdate::from_requested("claimed"))
            .await
            .unwrap();
        assert_eq!(reopened.status, "claimed");
        assert_eq!(reopened.is_resolved, Some(false));
        assert_eq!(reopened.title, "Blue umbrella");

        repo.delete(created.id).await.unwrap();
    }
}
