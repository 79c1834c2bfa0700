//! User repository
//!
//! The `password` column holds a salted hash; it never leaves this crate
//! in a response.

use chrono::{DateTime, Utc};
use recyconnect_core::config::AdminSection;
use recyconnect_core::domain::{generate_college_id, UserRole};
use sqlx::{FromRow, PgPool};

use super::DbError;

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub role: String,
    pub name: String,
    pub phone: Option<String>,
    pub college_id: String,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new account; `password` is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: String,
    pub name: String,
    pub phone: Option<String>,
    pub college_id: String,
    pub bio: Option<String>,
}

/// Partial profile update; `None` leaves the column alone
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

const USER_COLUMNS: &str =
    "id, email, password, role, uname AS name, phone, college_id, bio, created_at";

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<User>, DbError> {
        let users = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(self.pool)
            .await?;
        Ok(users)
    }

    pub async fn find(&self, id: i64) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<User, DbError> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Insert an account. Duplicate email or college id is a conflict.
    pub async fn create(&self, user: NewUser) -> Result<User, DbError> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO users (email, password, role, uname, phone, college_id, bio)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.role)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.college_id)
        .bind(&user.bio)
        .fetch_one(self.pool)
        .await
        .map_err(|e| DbError::on_write(e, "a user with this email or college id already exists"))
    }

    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<User, DbError> {
        sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                uname = COALESCE($2, uname),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                phone = COALESCE($5, phone),
                bio = COALESCE($6, bio)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.role)
        .bind(&changes.phone)
        .bind(&changes.bio)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| DbError::on_write(e, "a user with this email already exists"))?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", id));
        }
        Ok(())
    }

    /// Create the administrator account unless one with that email exists.
    /// `password_hash` is the bcrypt hash of `admin.password`.
    ///
    /// Returns true when an account was created.
    pub async fn ensure_admin(
        &self,
        admin: &AdminSection,
        password_hash: &str,
    ) -> Result<bool, DbError> {
        if self.find_by_email(&admin.email).await?.is_some() {
            tracing::info!(email = %admin.email, "Admin user already exists");
            return Ok(false);
        }

        self.create(NewUser {
            email: admin.email.clone(),
            password: password_hash.to_string(),
            role: UserRole::Admin.as_str().to_string(),
            name: admin.name.clone(),
            phone: admin.phone.clone(),
            college_id: generate_college_id(),
            bio: admin.bio.clone(),
        })
        .await?;

        tracing::info!(email = %admin.email, "Admin user created");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recyconnect_core::domain::hash_password_with_cost;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::schema::run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn ensure_admin_is_idempotent() {
        let pool = pool().await;
        let admin = AdminSection {
            email: format!("admin-{}@test.edu", uuid::Uuid::new_v4()),
            ..AdminSection::default()
        };
        let repo = UserRepo::new(&pool);

        let hash = hash_password_with_cost(&admin.password, 4).unwrap();

        assert!(repo.ensure_admin(&admin, &hash).await.unwrap());
        assert!(!repo.ensure_admin(&admin, &hash).await.unwrap());

        let stored = repo.find_by_email(&admin.email).await.unwrap().unwrap();
        assert_eq!(stored.role, "ADMIN");
        repo.delete(stored.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_email_is_conflict() {
        let pool = pool().await;
        let repo = UserRepo::new(&pool);
        let email = format!("dup-{}@test.edu", uuid::Uuid::new_v4());
        let new_user = || NewUser {
            email: email.clone(),
            password: hash_password_with_cost("pw", 4).unwrap(),
            role: "USER".into(),
            name: "Dup".into(),
            phone: None,
            college_id: generate_college_id() + &uuid::Uuid::new_v4().to_string()[..4],
            bio: None,
        };

        let first = repo.create(new_user()).await.unwrap();
        let err = repo.create(new_user()).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        repo.delete(first.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn email_differing_only_in_case_is_conflict() {
        let pool = pool().await;
        let repo = UserRepo::new(&pool);
        let tag = uuid::Uuid::new_v4().simple().to_string();
        let account = |email: String| NewUser {
            email,
            password: hash_password_with_cost("pw", 4).unwrap(),
            role: "USER".into(),
            name: "Case".into(),
            phone: None,
            college_id: format!("CTU-{}", uuid::Uuid::new_v4().simple()),
            bio: None,
        };

        let first = repo.create(account(format!("Case-{tag}@x.edu"))).await.unwrap();
        let err = repo
            .create(account(format!("case-{tag}@x.edu")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let found = repo
            .find_by_email(&format!("CASE-{tag}@X.EDU"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
        repo.delete(first.id).await.unwrap();
    }
}
