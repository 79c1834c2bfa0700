//! User concern repository

use chrono::{DateTime, Utc};
use recyconnect_core::domain::CONCERN_RESOLVED;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::DbError;
use crate::models::lenient;

/// Editable concern attributes other than the description
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcernDetails {
    #[serde(default)]
    pub concern_type: Option<String>,
    #[serde(default)]
    pub user_in_question: Option<String>,
    #[serde(default)]
    pub item_involved: Option<String>,
    #[serde(default)]
    pub evidence_files: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub contact_method: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub resolution_notes: Option<String>,
    #[serde(default)]
    pub admin_response: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConcern {
    pub id: i64,
    pub description: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub details: ConcernDetails,
    pub reported_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_date: Option<DateTime<Utc>>,
    /// Submitter
    pub user_id: Option<i64>,
    pub submitter_name: Option<String>,
}

const CONCERN_SELECT: &str = r#"
    SELECT
        c.id, c.description, c.concern_type, c.user_in_question, c.item_involved,
        c.evidence_files, c.urgency, c.contact_method, c.status, c.assigned_to,
        c.resolution_notes, c.admin_response, c.reported_by,
        c.created_at, c.updated_at, c.resolved_at, c.resolved_date,
        c.user_id, u.uname AS submitter_name
    FROM user_concerns c
    LEFT JOIN users u ON u.id = c.user_id
"#;

pub struct ConcernRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ConcernRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Concerns matching every given filter, newest first.
    pub async fn list(
        &self,
        status: Option<&str>,
        urgency: Option<&str>,
    ) -> Result<Vec<UserConcern>, DbError> {
        let concerns = sqlx::query_as(&format!(
            r#"
            {CONCERN_SELECT}
            WHERE ($1::TEXT IS NULL OR c.status = $1)
              AND ($2::TEXT IS NULL OR c.urgency = $2)
            ORDER BY c.created_at DESC
            "#
        ))
        .bind(status)
        .bind(urgency)
        .fetch_all(self.pool)
        .await?;
        Ok(concerns)
    }

    pub async fn list_by_submitter(&self, user_id: i64) -> Result<Vec<UserConcern>, DbError> {
        let concerns = sqlx::query_as(&format!(
            "{CONCERN_SELECT} WHERE c.user_id = $1 ORDER BY c.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(concerns)
    }

    pub async fn find(&self, id: i64) -> Result<Option<UserConcern>, DbError> {
        let concern = sqlx::query_as(&format!("{CONCERN_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(concern)
    }

    pub async fn get(&self, id: i64) -> Result<UserConcern, DbError> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("concern", id))
    }

    /// Insert a concern; `details` must already carry defaulted status and
    /// contact method.
    pub async fn create(
        &self,
        description: &str,
        details: &ConcernDetails,
        reported_by: Option<i64>,
        submitter_id: Option<i64>,
    ) -> Result<UserConcern, DbError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO user_concerns (
                description, concern_type, user_in_question, item_involved,
                evidence_files, urgency, contact_method, status, assigned_to,
                resolution_notes, admin_response, reported_by, user_id, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
            RETURNING id
            "#,
        )
        .bind(description)
        .bind(&details.concern_type)
        .bind(&details.user_in_question)
        .bind(&details.item_involved)
        .bind(&details.evidence_files)
        .bind(&details.urgency)
        .bind(&details.contact_method)
        .bind(&details.status)
        .bind(details.assigned_to)
        .bind(&details.resolution_notes)
        .bind(&details.admin_response)
        .bind(reported_by)
        .bind(submitter_id)
        .fetch_one(self.pool)
        .await?;

        self.get(id).await
    }

    /// Replace the editable fields. Moving to `resolved` stamps the
    /// resolution time once; later edits keep it.
    pub async fn replace(
        &self,
        id: i64,
        description: &str,
        details: &ConcernDetails,
    ) -> Result<UserConcern, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE user_concerns SET
                description = $2, concern_type = $3, user_in_question = $4,
                item_involved = $5, evidence_files = $6, urgency = $7,
                contact_method = COALESCE($8, contact_method),
                status = COALESCE($9, status),
                assigned_to = $10, resolution_notes = $11, admin_response = $12,
                resolved_at = CASE
                    WHEN COALESCE($9, status) = $13 AND resolved_at IS NULL THEN NOW()
                    ELSE resolved_at
                END,
                resolved_date = CASE
                    WHEN COALESCE($9, status) = $13 AND resolved_date IS NULL THEN NOW()
                    ELSE resolved_date
                END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(description)
        .bind(&details.concern_type)
        .bind(&details.user_in_question)
        .bind(&details.item_involved)
        .bind(&details.evidence_files)
        .bind(&details.urgency)
        .bind(&details.contact_method)
        .bind(&details.status)
        .bind(details.assigned_to)
        .bind(&details.resolution_notes)
        .bind(&details.admin_response)
        .bind(CONCERN_RESOLVED)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("concern", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM user_concerns WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("concern", id));
        }
        Ok(())
    }
}
