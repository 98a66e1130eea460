//! Database schema migrations (idempotent).
//!
//! Both databases hold submissions in the same two tables:
//!
//! - `submissions`: one row per record (`sid`, form, timestamps, draft flag, notes)
//! - `submission_data`: one row per element, value stored as JSON
//!
//! The primary database additionally has `key_value` for pipeline state.
//! The archive adds `revision`, `archived_at` and `updated_at` to
//! `submissions`.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let source = db::connect_path(&config.source.path, true).await?;
    migrate_source(&source).await?;
    source.close().await;
    tracing::info!(path = %config.source.path.display(), "primary schema ready");

    let archive = db::connect_path(&config.archive.path, true).await?;
    migrate_archive(&archive).await?;
    archive.close().await;
    tracing::info!(path = %config.archive.path.display(), "archive schema ready");

    Ok(())
}

pub async fn migrate_source(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            sid INTEGER PRIMARY KEY,
            form_id TEXT NOT NULL,
            created INTEGER NOT NULL,
            changed INTEGER NOT NULL,
            in_draft INTEGER NOT NULL DEFAULT 0,
            notes TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_data_table(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS key_value (
            collection TEXT NOT NULL,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (collection, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_submissions_changed ON submissions(changed, sid)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn migrate_archive(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            sid INTEGER PRIMARY KEY,
            form_id TEXT NOT NULL,
            created INTEGER NOT NULL,
            changed INTEGER NOT NULL,
            in_draft INTEGER NOT NULL DEFAULT 0,
            notes TEXT NOT NULL DEFAULT '',
            revision INTEGER NOT NULL DEFAULT 1,
            archived_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_data_table(pool).await?;

    Ok(())
}

async fn create_data_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submission_data (
            sid INTEGER NOT NULL,
            delta INTEGER NOT NULL,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (sid, name),
            FOREIGN KEY (sid) REFERENCES submissions(sid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_submission_data_sid ON submission_data(sid, delta)")
        .execute(pool)
        .await?;

    Ok(())
}
