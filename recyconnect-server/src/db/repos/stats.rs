//! Dashboard counters

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::DbError;

/// Row counts shown on the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Accounts not marked DELETED
    pub users: i64,
    pub donated_items: i64,
    pub reported_items: i64,
    pub concerns: i64,
    pub flags: i64,
}

pub struct StatsRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All counters in one round trip.
    pub async fn dashboard(&self) -> Result<DashboardStats, DbError> {
        let stats = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role <> 'DELETED') AS users,
                (SELECT COUNT(*) FROM donated_items) AS donated_items,
                (SELECT COUNT(*) FROM reported_items) AS reported_items,
                (SELECT COUNT(*) FROM user_concerns) AS concerns,
                (SELECT COUNT(*) FROM flags) AS flags
            "#,
        )
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }
}
