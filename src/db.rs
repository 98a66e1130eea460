//! SQLite database connection management.
//!
//! Two databases are in play: the primary submission database and the
//! long term storage (LTS) archive. Both use WAL journal mode.
//!
//! The archive is only created by `lts init`. Every other command opens it
//! with [`connect_archive`], which fails when the file is missing instead
//! of silently creating an empty archive next to a typo'd path.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use forms_lts_core::copy::CopyOrchestrator;

use crate::config::Config;
use crate::sqlite_store::{SqliteArchiveStore, SqliteKeyValue, SqliteSourceStore};

/// Open a pool on the database at `path`.
///
/// With `create` set, the file and its parent directories are created
/// when missing.
pub async fn connect_path(path: &Path, create: bool) -> Result<SqlitePool> {
    if create {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(create)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

    Ok(pool)
}

/// Pool on the primary submission database.
pub async fn connect_source(config: &Config) -> Result<SqlitePool> {
    connect_path(&config.source.path, false).await
}

/// Pool on the LTS archive, which must already exist.
pub async fn connect_archive(config: &Config) -> Result<SqlitePool> {
    if !config.archive.path.exists() {
        anyhow::bail!(
            "The LTS database must exist for copying to work: {} (run `lts init`)",
            config.archive.path.display()
        );
    }
    connect_path(&config.archive.path, false).await
}

/// The three stores a copy run works against.
pub struct Stores {
    pub source: SqliteSourceStore,
    pub archive: SqliteArchiveStore,
    pub state: SqliteKeyValue,
}

impl Stores {
    /// Open both databases. Pipeline state lives in the primary database.
    pub async fn open(config: &Config) -> Result<Self> {
        let source = connect_source(config).await?;
        let archive = connect_archive(config).await?;
        Ok(Self {
            state: SqliteKeyValue::new(source.clone()),
            source: SqliteSourceStore::new(source),
            archive: SqliteArchiveStore::new(archive),
        })
    }

    pub fn orchestrator(&self, config: &Config) -> CopyOrchestrator<'_> {
        CopyOrchestrator::new(&self.source, &self.archive, &self.state)
            .with_policy(config.copy.watermark_policy)
    }

    pub async fn close(self) {
        self.source.pool().close().await;
        self.archive.pool().close().await;
    }
}
