//! Drop-and-recreate schema management.
//!
//! Running [`reset`] twice in a row leaves the database in the same state:
//! every table is dropped (children first) and recreated empty, and the
//! photo upload directory is emptied.

use std::path::Path;

use sqlx::{Pool, Postgres};
use tracing::info;

/// Tables in drop order (dependents before their parents).
pub const TABLES: [&str; 5] = ["photos", "history_messages", "user_relations", "apartments", "users"];

const CREATE_STATEMENTS: &[&str] = &[
    r#"CREATE TABLE users (
        id BIGSERIAL PRIMARY KEY,
        username VARCHAR(100) NOT NULL,
        email VARCHAR(100) NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        is_owner BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE apartments (
        id BIGSERIAL PRIMARY KEY,
        address VARCHAR(255) NOT NULL,
        city VARCHAR(100) NOT NULL,
        inventory TEXT NULL,
        to_check BOOLEAN NOT NULL DEFAULT FALSE,
        owner_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    "CREATE UNIQUE INDEX idx_users_email_lower ON users (lower(email))",
    "CREATE INDEX idx_apartments_owner ON apartments (owner_id)",
    r#"CREATE TABLE user_relations (
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        related_user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, related_user_id),
        CHECK (user_id <> related_user_id)
    )"#,
    r#"CREATE TABLE history_messages (
        id BIGSERIAL PRIMARY KEY,
        apartment_id BIGINT NOT NULL REFERENCES apartments(id) ON DELETE CASCADE,
        sender_id BIGINT NULL REFERENCES users(id) ON DELETE SET NULL,
        message_content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    "CREATE INDEX idx_history_apartment ON history_messages (apartment_id)",
    r#"CREATE TABLE photos (
        id BIGSERIAL PRIMARY KEY,
        apartment_id BIGINT NOT NULL REFERENCES apartments(id) ON DELETE CASCADE,
        photo_url VARCHAR(500) NOT NULL,
        message TEXT,
        status VARCHAR(16) NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'approved', 'rejected')),
        uploaded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        uploaded_by VARCHAR(100),
        reviewed_at TIMESTAMPTZ NULL,
        reviewed_by VARCHAR(100),
        feedback TEXT
    )"#,
    "CREATE INDEX idx_photos_apartment ON photos (apartment_id)",
    "CREATE INDEX idx_photos_status ON photos (status)",
    "CREATE INDEX idx_photos_uploaded_at ON photos (uploaded_at)",
];

/// Drop and recreate all tables inside one transaction.
pub async fn recreate_tables(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for table in TABLES {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
            .execute(&mut *tx)
            .await?;
    }
    for stmt in CREATE_STATEMENTS {
        sqlx::query(stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!(tables = TABLES.len(), "schema recreated");
    Ok(())
}

/// Remove every stored upload and leave an empty directory behind.
pub async fn reset_upload_dir(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::create_dir_all(dir).await?;
    info!(dir = %dir.display(), "upload directory reset");
    Ok(())
}

pub async fn reset(pool: &Pool<Postgres>, upload_dir: &Path) -> anyhow::Result<()> {
    recreate_tables(pool).await?;
    reset_upload_dir(upload_dir).await?;
    Ok(())
}
