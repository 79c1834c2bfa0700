//! Table definitions, applied idempotently at startup

use sqlx::PgPool;

const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'USER',
            uname TEXT NOT NULL,
            phone TEXT,
            college_id TEXT NOT NULL UNIQUE,
            bio TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "items",
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            description VARCHAR(1000) NOT NULL,
            category TEXT NOT NULL,
            condition TEXT NOT NULL,
            verified BOOLEAN NOT NULL DEFAULT FALSE,
            user_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
            usage_time INTEGER,
            usage_time_unit TEXT,
            warranty TEXT,
            original_price NUMERIC(12, 2),
            asking_price NUMERIC(12, 2),
            quantity INTEGER,
            pickup_location TEXT,
            delivery TEXT,
            battery_health TEXT,
            repairs TEXT,
            working_status TEXT,
            dimensions TEXT,
            dimension_length INTEGER,
            dimension_width INTEGER,
            dimension_height INTEGER,
            dimension_unit TEXT,
            material TEXT,
            color TEXT,
            urgency TEXT,
            deadline TEXT,
            receipt TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ
        )
        "#,
    ),
    (
        "item_images",
        r#"
        CREATE TABLE IF NOT EXISTS item_images (
            id BIGSERIAL PRIMARY KEY,
            item_id BIGINT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            file_name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            image_url TEXT NOT NULL,
            file_size BIGINT NOT NULL,
            file_type TEXT NOT NULL,
            is_primary BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    ),
    (
        "donated_items",
        r#"
        CREATE TABLE IF NOT EXISTS donated_items (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            description VARCHAR(1000) NOT NULL,
            category TEXT NOT NULL,
            condition TEXT NOT NULL,
            estimated_value NUMERIC(12, 2),
            location TEXT NOT NULL,
            donor_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            claimed_by_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
            claimed_date TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "reported_items",
        r#"
        CREATE TABLE IF NOT EXISTS reported_items (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            description VARCHAR(1000) NOT NULL,
            category TEXT NOT NULL,
            color TEXT,
            brand TEXT,
            item_type TEXT NOT NULL,
            location_lost TEXT,
            location_found TEXT,
            current_location TEXT,
            date_lost DATE,
            date_found DATE,
            time_lost TIME,
            time_found TIME,
            contact_info TEXT,
            image TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            is_resolved BOOLEAN,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ,
            user_id BIGINT REFERENCES users(id) ON DELETE SET NULL
        )
        "#,
    ),
    (
        "user_concerns",
        r#"
        CREATE TABLE IF NOT EXISTS user_concerns (
            id BIGSERIAL PRIMARY KEY,
            concern_type TEXT,
            user_in_question TEXT,
            item_involved TEXT,
            description VARCHAR(2000) NOT NULL,
            evidence_files TEXT,
            urgency TEXT,
            contact_method TEXT,
            status TEXT,
            reported_by BIGINT,
            assigned_to BIGINT,
            resolution_notes TEXT,
            admin_response VARCHAR(1000),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ,
            resolved_at TIMESTAMPTZ,
            resolved_date TIMESTAMPTZ,
            user_id BIGINT REFERENCES users(id) ON DELETE SET NULL
        )
        "#,
    ),
    (
        "flags",
        r#"
        CREATE TABLE IF NOT EXISTS flags (
            id BIGSERIAL PRIMARY KEY,
            flag_type TEXT NOT NULL,
            reason TEXT NOT NULL,
            description VARCHAR(1000),
            status TEXT NOT NULL DEFAULT 'PENDING',
            target_id BIGINT NOT NULL,
            target_type TEXT NOT NULL,
            flagged_content TEXT,
            severity TEXT NOT NULL DEFAULT 'MEDIUM',
            admin_notes VARCHAR(1000),
            flagged_by_user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            reviewed_by_admin_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ,
            resolved_at TIMESTAMPTZ,
            UNIQUE (flagged_by_user_id, target_id, target_type)
        )
        "#,
    ),
    (
        "messages",
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id BIGSERIAL PRIMARY KEY,
            sender_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
            receiver_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
            item_id BIGINT REFERENCES items(id) ON DELETE SET NULL,
            content TEXT NOT NULL,
            timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    // Email lookups ignore case, so uniqueness must too
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx ON users (LOWER(email))",
    "CREATE INDEX IF NOT EXISTS idx_items_user ON items(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_items_category ON items(category)",
    "CREATE INDEX IF NOT EXISTS idx_item_images_item ON item_images(item_id)",
    "CREATE INDEX IF NOT EXISTS idx_donated_items_donor ON donated_items(donor_id)",
    "CREATE INDEX IF NOT EXISTS idx_reported_items_status ON reported_items(status)",
    "CREATE INDEX IF NOT EXISTS idx_user_concerns_status ON user_concerns(status)",
    "CREATE INDEX IF NOT EXISTS idx_flags_status ON flags(status)",
    "CREATE INDEX IF NOT EXISTS idx_flags_target ON flags(target_type, target_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_item ON messages(item_id)",
];

/// Create all tables and indexes that do not exist yet
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Applying schema...");

    for (table, ddl) in TABLES {
        tracing::debug!(table, "ensuring table");
        sqlx::query(ddl).execute(pool).await?;
    }

    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!(tables = TABLES.len(), "Schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_created_before_their_references() {
        let position = |name: &str| TABLES.iter().position(|(t, _)| *t == name).unwrap();

        for (i, (_, ddl)) in TABLES.iter().enumerate() {
            for (referenced, _) in TABLES {
                if ddl.contains(&format!("REFERENCES {referenced}(")) {
                    assert!(position(referenced) < i, "{referenced} must precede");
                }
            }
        }
    }

    #[test]
    fn statements_are_idempotent() {
        assert!(TABLES.iter().all(|(_, ddl)| ddl.contains("IF NOT EXISTS")));
        assert!(INDEXES.iter().all(|ddl| ddl.contains("IF NOT EXISTS")));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn schema_applies_twice() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        run(&pool).await.unwrap();
        run(&pool).await.unwrap();
    }
}
