//! Moderation flag repository

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use recyconnect_core::domain::{FlagStatus, Severity};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::DbError;

/// Flag record with flagger and reviewer display names
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub id: i64,
    pub flag_type: String,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
    pub target_id: i64,
    pub target_type: String,
    pub flagged_content: Option<String>,
    pub severity: String,
    pub admin_notes: Option<String>,
    pub flagged_by_user_id: i64,
    pub flagged_by_user_name: Option<String>,
    pub reviewed_by_admin_id: Option<i64>,
    pub reviewed_by_admin_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewFlag {
    pub flag_type: String,
    pub reason: String,
    pub description: Option<String>,
    pub target_id: i64,
    pub target_type: String,
    pub flagged_content: String,
    pub severity: Severity,
    pub flagged_by_user_id: i64,
}

/// Review changes; `None` leaves the column alone
#[derive(Debug, Clone, Default)]
pub struct FlagUpdate {
    pub status: Option<FlagStatus>,
    pub severity: Option<Severity>,
    /// `Some("")` clears the notes
    pub admin_notes: Option<String>,
    pub reviewed_by_admin_id: Option<i64>,
}

/// Flag counters for one target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct FlagCounts {
    pub total: i64,
    pub pending: i64,
}

/// Listing selected from the query-string filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagQuery {
    StatusAndSeverity(FlagStatus, Severity),
    Status(FlagStatus),
    FlagType(String),
    Severity(Severity),
    /// Review queue: pending flags, most severe first
    PendingByPriority,
}

impl FlagQuery {
    /// First matching combination wins.
    pub fn from_filters(
        status: Option<FlagStatus>,
        flag_type: Option<&str>,
        severity: Option<Severity>,
    ) -> Self {
        match (status, flag_type, severity) {
            (Some(status), _, Some(severity)) => Self::StatusAndSeverity(status, severity),
            (Some(status), _, None) => Self::Status(status),
            (None, Some(flag_type), _) => Self::FlagType(flag_type.trim().to_ascii_uppercase()),
            (None, None, Some(severity)) => Self::Severity(severity),
            (None, None, None) => Self::PendingByPriority,
        }
    }
}

const FLAG_SELECT: &str = r#"
    SELECT
        f.id, f.flag_type, f.reason, f.description, f.status, f.target_id,
        f.target_type, f.flagged_content, f.severity, f.admin_notes,
        f.flagged_by_user_id, fb.uname AS flagged_by_user_name,
        f.reviewed_by_admin_id, ra.uname AS reviewed_by_admin_name,
        f.created_at, f.updated_at, f.resolved_at
    FROM flags f
    LEFT JOIN users fb ON fb.id = f.flagged_by_user_id
    LEFT JOIN users ra ON ra.id = f.reviewed_by_admin_id
"#;

/// `ORDER BY` key ranking severities by review priority
static PRIORITY_ORDER: Lazy<String> = Lazy::new(|| {
    let arms: String = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ]
    .iter()
    .map(|s| format!(" WHEN '{}' THEN {}", s.as_str(), s.priority()))
    .collect();
    format!("CASE f.severity{arms} ELSE 5 END")
});

pub struct FlagRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> FlagRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &FlagQuery) -> Result<Vec<Flag>, DbError> {
        let newest = "ORDER BY f.created_at DESC, f.id DESC";
        let flags = match query {
            FlagQuery::StatusAndSeverity(status, severity) => {
                sqlx::query_as(&format!(
                    "{FLAG_SELECT} WHERE f.status = $1 AND f.severity = $2 {newest}"
                ))
                .bind(status.as_str())
                .bind(severity.as_str())
                .fetch_all(self.pool)
                .await?
            }
            FlagQuery::Status(status) => {
                sqlx::query_as(&format!("{FLAG_SELECT} WHERE f.status = $1 {newest}"))
                    .bind(status.as_str())
                    .fetch_all(self.pool)
                    .await?
            }
            FlagQuery::FlagType(flag_type) => {
                sqlx::query_as(&format!("{FLAG_SELECT} WHERE f.flag_type = $1 {newest}"))
                    .bind(flag_type)
                    .fetch_all(self.pool)
                    .await?
            }
            FlagQuery::Severity(severity) => {
                sqlx::query_as(&format!("{FLAG_SELECT} WHERE f.severity = $1 {newest}"))
                    .bind(severity.as_str())
                    .fetch_all(self.pool)
                    .await?
            }
            FlagQuery::PendingByPriority => {
                sqlx::query_as(&format!(
                    "{FLAG_SELECT} WHERE f.status = $1 ORDER BY {}, f.created_at DESC, f.id DESC",
                    *PRIORITY_ORDER
                ))
                .bind(FlagStatus::Pending.as_str())
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(flags)
    }

    pub async fn list_by_flagger(&self, user_id: i64) -> Result<Vec<Flag>, DbError> {
        let flags = sqlx::query_as(&format!(
            "{FLAG_SELECT} WHERE f.flagged_by_user_id = $1 ORDER BY f.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(flags)
    }

    pub async fn list_for_target(
        &self,
        target_type: &str,
        target_id: i64,
    ) -> Result<Vec<Flag>, DbError> {
        let flags = sqlx::query_as(&format!(
            "{FLAG_SELECT} WHERE f.target_type = $1 AND f.target_id = $2 ORDER BY f.created_at DESC"
        ))
        .bind(target_type)
        .bind(target_id)
        .fetch_all(self.pool)
        .await?;
        Ok(flags)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Flag>, DbError> {
        let flag = sqlx::query_as(&format!("{FLAG_SELECT} WHERE f.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(flag)
    }

    pub async fn get(&self, id: i64) -> Result<Flag, DbError> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("flag", id))
    }

    /// Whether this user already flagged this target.
    pub async fn exists_for(
        &self,
        user_id: i64,
        target_id: i64,
        target_type: &str,
    ) -> Result<bool, DbError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM flags
                WHERE flagged_by_user_id = $1 AND target_id = $2 AND target_type = $3
            )
            "#,
        )
        .bind(user_id)
        .bind(target_id)
        .bind(target_type)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a pending flag. A duplicate (user, target) is a conflict.
    pub async fn create(&self, flag: &NewFlag) -> Result<Flag, DbError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO flags (
                flag_type, reason, description, status, target_id, target_type,
                flagged_content, severity, flagged_by_user_id, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            RETURNING id
            "#,
        )
        .bind(&flag.flag_type)
        .bind(&flag.reason)
        .bind(&flag.description)
        .bind(FlagStatus::Pending.as_str())
        .bind(flag.target_id)
        .bind(&flag.target_type)
        .bind(&flag.flagged_content)
        .bind(flag.severity.as_str())
        .bind(flag.flagged_by_user_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            DbError::on_write(e, &format!("You have already flagged this {}", flag.target_type))
        })?;

        self.get(id).await
    }

    /// Apply review changes. A closing status stamps `resolved_at`.
    pub async fn update(&self, id: i64, update: &FlagUpdate) -> Result<Flag, DbError> {
        let closes = update.status.is_some_and(FlagStatus::is_closed);
        let result = sqlx::query(
            r#"
            UPDATE flags SET
                status = COALESCE($2, status),
                severity = COALESCE($3, severity),
                admin_notes = CASE
                    WHEN $4::TEXT IS NULL THEN admin_notes
                    ELSE NULLIF($4, '')
                END,
                reviewed_by_admin_id = COALESCE($5, reviewed_by_admin_id),
                resolved_at = CASE WHEN $6 THEN NOW() ELSE resolved_at END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.status.map(FlagStatus::as_str))
        .bind(update.severity.map(Severity::as_str))
        .bind(&update.admin_notes)
        .bind(update.reviewed_by_admin_id)
        .bind(closes)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("flag", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM flags WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("flag", id));
        }
        Ok(())
    }

    pub async fn counts(&self, target_type: &str, target_id: i64) -> Result<FlagCounts, DbError> {
        let counts = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = $3) AS pending
            FROM flags
            WHERE target_type = $1 AND target_id = $2
            "#,
        )
        .bind(target_type)
        .bind(target_id)
        .bind(FlagStatus::Pending.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_dispatch_first_match_wins() {
        use FlagQuery as Q;

        assert_eq!(
            Q::from_filters(Some(FlagStatus::Reviewed), Some("spam"), Some(Severity::High)),
            Q::StatusAndSeverity(FlagStatus::Reviewed, Severity::High)
        );
        assert_eq!(
            Q::from_filters(Some(FlagStatus::Pending), Some("spam"), None),
            Q::Status(FlagStatus::Pending)
        );
        assert_eq!(
            Q::from_filters(None, Some(" spam "), Some(Severity::Low)),
            Q::FlagType("SPAM".into())
        );
        assert_eq!(
            Q::from_filters(None, None, Some(Severity::Critical)),
            Q::Severity(Severity::Critical)
        );
        assert_eq!(Q::from_filters(None, None, None), Q::PendingByPriority);
    }

    #[test]
    fn priority_order_ranks_critical_first() {
        let order = PRIORITY_ORDER.as_str();
        assert!(order.starts_with("CASE f.severity"));
        assert!(order.contains("WHEN 'CRITICAL' THEN 1"));
        assert!(order.contains("WHEN 'LOW' THEN 4"));
        assert!(order.find("CRITICAL") < order.find("HIGH"));
    }

    #[test]
    fn counts_serialize_plain_keys() {
        let json = serde_json::to_value(FlagCounts { total: 3, pending: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({"total": 3, "pending": 1}));
    }

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::schema::run(&pool).await.unwrap();
        pool
    }

    async fn flagger(pool: &PgPool) -> crate::db::repos::User {
        use crate::db::repos::{NewUser, UserRepo};
        use recyconnect_core::domain::hash_password_with_cost;

        UserRepo::new(pool)
            .create(NewUser {
                email: format!("flagger-{}@test.edu", uuid::Uuid::new_v4()),
                password: hash_password_with_cost("pw", 4).unwrap(),
                role: "USER".into(),
                name: "Flagger".into(),
                phone: None,
                college_id: uuid::Uuid::new_v4().to_string(),
                bio: None,
            })
            .await
            .unwrap()
    }

    fn new_flag(user_id: i64, reason: &str, target_id: i64) -> NewFlag {
        NewFlag {
            flag_type: "CONTENT".into(),
            reason: reason.into(),
            description: None,
            target_id,
            target_type: "message".into(),
            flagged_content: "Unknown Content".into(),
            severity: Severity::from_reason(reason),
            flagged_by_user_id: user_id,
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_flag_is_conflict() {
        use crate::db::repos::UserRepo;

        let pool = pool().await;
        let user = flagger(&pool).await;
        let repo = FlagRepo::new(&pool);
        let flag = new_flag(user.id, "SPAM", 4242);

        let created = repo.create(&flag).await.unwrap();
        assert_eq!(created.severity, "HIGH");
        assert_eq!(created.status, "PENDING");
        assert_eq!(created.flagged_by_user_name.as_deref(), Some("Flagger"));
        assert!(repo.exists_for(user.id, 4242, "message").await.unwrap());

        let err = repo.create(&flag).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(ref m) if m == "You have already flagged this message"));

        let closed = repo
            .update(
                created.id,
                &FlagUpdate {
                    status: Some(FlagStatus::Dismissed),
                    ..FlagUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(closed.resolved_at.is_some());

        UserRepo::new(&pool).delete(user.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pending_flags_rank_by_severity_then_newest() {
        use crate::db::repos::UserRepo;

        let pool = pool().await;
        let user = flagger(&pool).await;
        let repo = FlagRepo::new(&pool);

        // Inserted out of priority order; two LOW flags to check the tie-break
        let low_old = repo.create(&new_flag(user.id, "OTHER", 1)).await.unwrap();
        let medium = repo.create(&new_flag(user.id, "MISLEADING", 2)).await.unwrap();
        let critical = repo.create(&new_flag(user.id, "FRAUD", 3)).await.unwrap();
        let high = repo.create(&new_flag(user.id, "SPAM", 4)).await.unwrap();
        let low_new = repo.create(&new_flag(user.id, "OTHER", 5)).await.unwrap();
        let dismissed = repo.create(&new_flag(user.id, "HARASSMENT", 6)).await.unwrap();
        repo.update(
            dismissed.id,
            &FlagUpdate {
                status: Some(FlagStatus::Dismissed),
                ..FlagUpdate::default()
            },
        )
        .await
        .unwrap();

        let ours: Vec<i64> = repo
            .list(&FlagQuery::PendingByPriority)
            .await
            .unwrap()
            .into_iter()
            .filter(|f| f.flagged_by_user_id == user.id)
            .map(|f| f.id)
            .collect();

        assert_eq!(
            ours,
            vec![critical.id, high.id, medium.id, low_new.id, low_old.id]
        );

        UserRepo::new(&pool).delete(user.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn empty_admin_notes_clear_and_absent_notes_keep() {
        use crate::db::repos::UserRepo;

        let pool = pool().await;
        let user = flagger(&pool).await;
        let repo = FlagRepo::new(&pool);
        let flag = repo.create(&new_flag(user.id, "SPAM", 77)).await.unwrap();

        let noted = repo
            .update(
                flag.id,
                &FlagUpdate {
                    admin_notes: Some("checked listing".into()),
                    ..FlagUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(noted.admin_notes.as_deref(), Some("checked listing"));

        let kept = repo
            .update(
                flag.id,
                &FlagUpdate {
                    status: Some(FlagStatus::Reviewed),
                    ..FlagUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(kept.admin_notes.as_deref(), Some("checked listing"));

        let cleared = repo
            .update(
                flag.id,
                &FlagUpdate {
                    admin_notes: Some(String::new()),
                    ..FlagUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.admin_notes, None);

        UserRepo::new(&pool).delete(user.id).await.unwrap();
    }
}
