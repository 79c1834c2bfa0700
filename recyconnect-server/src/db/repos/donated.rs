//! Donation repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::DbError;

/// Donation record with the donor's display name
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonatedItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub estimated_value: Option<Decimal>,
    pub pickup_location: String,
    pub donor_id: i64,
    pub donor_name: Option<String>,
    /// Mirrors `donor_id` for clients that read `userId`
    pub user_id: i64,
    pub claimed_by_id: Option<i64>,
    pub claimed_date: Option<DateTime<Utc>>,
    pub donated_date: DateTime<Utc>,
}

/// Validated editable fields of a donation
#[derive(Debug, Clone)]
pub struct DonationFields {
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub estimated_value: Option<Decimal>,
    pub pickup_location: String,
}

const DONATED_SELECT: &str = r#"
    SELECT
        d.id, d.title, d.description, d.category, d.condition, d.estimated_value,
        d.location AS pickup_location, d.donor_id, u.uname AS donor_name,
        d.donor_id AS user_id, d.claimed_by_id, d.claimed_date,
        d.created_at AS donated_date
    FROM donated_items d
    LEFT JOIN users u ON u.id = d.donor_id
"#;

pub struct DonatedRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DonatedRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All donations, optionally narrowed to one category.
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<DonatedItem>, DbError> {
        let items = match category {
            Some(category) => {
                sqlx::query_as(&format!(
                    "{DONATED_SELECT} WHERE d.category = $1 ORDER BY d.created_at DESC"
                ))
                .bind(category)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!("{DONATED_SELECT} ORDER BY d.created_at DESC"))
                    .fetch_all(self.pool)
                    .await?
            }
        };
        Ok(items)
    }

    pub async fn list_by_donor(&self, donor_id: i64) -> Result<Vec<DonatedItem>, DbError> {
        let items = sqlx::query_as(&format!(
            "{DONATED_SELECT} WHERE d.donor_id = $1 ORDER BY d.created_at DESC"
        ))
        .bind(donor_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    pub async fn find(&self, id: i64) -> Result<Option<DonatedItem>, DbError> {
        let item = sqlx::query_as(&format!("{DONATED_SELECT} WHERE d.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(item)
    }

    pub async fn get(&self, id: i64) -> Result<DonatedItem, DbError> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("donated item", id))
    }

    pub async fn create(&self, donor_id: i64, fields: &DonationFields) -> Result<DonatedItem, DbError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO donated_items
                (title, description, category, condition, estimated_value, location, donor_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.category)
        .bind(&fields.condition)
        .bind(fields.estimated_value)
        .bind(&fields.pickup_location)
        .bind(donor_id)
        .fetch_one(self.pool)
        .await?;

        self.get(id).await
    }

    /// Replace editable fields. The claimed date is stamped when the
    /// claimant changes to a new user and cleared when the claim is removed.
    pub async fn update(
        &self,
        id: i64,
        fields: &DonationFields,
        claimed_by_id: Option<i64>,
    ) -> Result<DonatedItem, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE donated_items SET
                title = $2, description = $3, category = $4, condition = $5,
                estimated_value = $6, location = $7,
                claimed_date = CASE
                    WHEN $8::BIGINT IS NULL THEN NULL
                    WHEN claimed_by_id IS DISTINCT FROM $8 THEN NOW()
                    ELSE claimed_date
                END,
                claimed_by_id = $8
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.category)
        .bind(&fields.condition)
        .bind(fields.estimated_value)
        .bind(&fields.pickup_location)
        .bind(claimed_by_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("donated item", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM donated_items WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("donated item", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::{NewUser, UserRepo};
    use recyconnect_core::domain::hash_password_with_cost;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn claim_stamps_date_once() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::schema::run(&pool).await.unwrap();

        let users = UserRepo::new(&pool);
        let donor = users
            .create(NewUser {
                email: format!("donor-{}@test.edu", uuid::Uuid::new_v4()),
                password: hash_password_with_cost("pw", 4).unwrap(),
                role: "USER".into(),
                name: "Donor".into(),
                phone: None,
                college_id: uuid::Uuid::new_v4().to_string(),
                bio: None,
            })
            .await
            .unwrap();

        let repo = DonatedRepo::new(&pool);
        let fields = DonationFields {
            title: "Lamp".into(),
            description: "Desk lamp".into(),
            category: "electronics".into(),
            condition: "good".into(),
            estimated_value: None,
            pickup_location: "Block A".into(),
        };
        let created = repo.create(donor.id, &fields).await.unwrap();
        assert_eq!(created.user_id, donor.id);
        assert_eq!(created.donor_name.as_deref(), Some("Donor"));
        assert!(created.claimed_date.is_none());

        let claimed = repo.update(created.id, &fields, Some(donor.id)).await.unwrap();
        let stamped = claimed.claimed_date.expect("claim stamps date");

        let again = repo.update(created.id, &fields, Some(donor.id)).await.unwrap();
        assert_eq!(again.claimed_date, Some(stamped));

        users.delete(donor.id).await.unwrap();
    }
}
