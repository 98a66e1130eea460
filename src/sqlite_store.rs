//! SQLite-backed store implementations.
//!
//! - [`SqliteSourceStore`]: the primary submission database.
//! - [`SqliteArchiveStore`]: the long term storage archive.
//! - [`SqliteKeyValue`]: pipeline state in the primary database's
//!   `key_value` table.
//!
//! The two record stores share the row mapping in [`load_record`] and
//! nothing else. Schema: see [`migrate`](crate::migrate).

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use forms_lts_core::models::{ArchiveEntry, Element, Record, RecordId, Timestamp};
use forms_lts_core::store::{
    ArchiveStore, KeyValueStore, RecordStore, ResaveOutcome, SourceStore,
};

/// `key_value` collection holding the copy pipeline's state.
pub const STATE_COLLECTION: &str = "forms_lts";

async fn load_record(pool: &SqlitePool, id: RecordId) -> Result<Option<Record>> {
    let row = sqlx::query(
        "SELECT sid, form_id, created, changed, in_draft, notes FROM submissions WHERE sid = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    let data_rows = sqlx::query(
        "SELECT name, type, value FROM submission_data WHERE sid = ? ORDER BY delta ASC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let mut elements = Vec::with_capacity(data_rows.len());
    for data in &data_rows {
        let name: String = data.get("name");
        let raw: String = data.get("value");
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in submission {} element '{}'", id, name))?;
        elements.push(Element {
            id: name,
            element_type: data.get("type"),
            value,
        });
    }

    let in_draft: i64 = row.get("in_draft");
    Ok(Some(Record {
        id: row.get("sid"),
        form_id: row.get("form_id"),
        created: row.get("created"),
        changed: row.get("changed"),
        draft: in_draft != 0,
        elements,
        notes: row.get("notes"),
    }))
}

async fn replace_elements(
    tx: &mut Transaction<'_, Sqlite>,
    record: &Record,
) -> Result<()> {
    sqlx::query("DELETE FROM submission_data WHERE sid = ?")
        .bind(record.id)
        .execute(&mut **tx)
        .await?;

    for (delta, element) in record.elements.iter().enumerate() {
        sqlx::query(
            "INSERT INTO submission_data (sid, delta, name, type, value) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(delta as i64)
        .bind(&element.id)
        .bind(&element.element_type)
        .bind(serde_json::to_string(&element.value)?)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Primary store
// ═══════════════════════════════════════════════════════════════════════

/// The primary submission database.
pub struct SqliteSourceStore {
    pool: SqlitePool,
}

impl SqliteSourceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a submission with all its elements.
    ///
    /// Submissions are authored by the forms system; this exists for
    /// seeding and tests.
    pub async fn save(&self, record: &Record) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO submissions (sid, form_id, created, changed, in_draft, notes)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(sid) DO UPDATE SET
                form_id = excluded.form_id,
                created = excluded.created,
                changed = excluded.changed,
                in_draft = excluded.in_draft,
                notes = excluded.notes
            "#,
        )
        .bind(record.id)
        .bind(&record.form_id)
        .bind(record.created)
        .bind(record.changed)
        .bind(record.draft as i64)
        .bind(&record.notes)
        .execute(&mut *tx)
        .await?;

        replace_elements(&mut tx, record).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Number of non-draft submissions changed after `since`.
    pub async fn count_changed_since(&self, since: Timestamp) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE changed > ? AND in_draft = 0")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for SqliteSourceStore {
    async fn load(&self, id: RecordId) -> Result<Option<Record>> {
        load_record(&self.pool, id).await
    }
}

#[async_trait]
impl SourceStore for SqliteSourceStore {
    async fn find_changed_since(
        &self,
        since: Timestamp,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecordId>> {
        // SQLite treats a negative LIMIT as no limit.
        let ids: Vec<RecordId> = sqlx::query_scalar(
            r#"
            SELECT sid FROM submissions
            WHERE changed > ? AND in_draft = 0
            ORDER BY changed ASC, sid ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(since)
        .bind(limit)
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Archive
// ═══════════════════════════════════════════════════════════════════════

/// The long term storage archive.
pub struct SqliteArchiveStore {
    pool: SqlitePool,
}

impl SqliteArchiveStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Single-transaction write. Any error drops `tx`, which rolls back.
    async fn write(&self, record: &Record, is_new: bool) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let updated = if is_new {
            0
        } else {
            sqlx::query(
                r#"
                UPDATE submissions SET
                    form_id = ?, created = ?, changed = ?, in_draft = ?, notes = ?,
                    revision = revision + 1, updated_at = ?
                WHERE sid = ?
                "#,
            )
            .bind(&record.form_id)
            .bind(record.created)
            .bind(record.changed)
            .bind(record.draft as i64)
            .bind(&record.notes)
            .bind(now)
            .bind(record.id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
        };

        if updated == 0 {
            // Also reached by an update for a record the archive never got.
            sqlx::query(
                r#"
                INSERT INTO submissions (sid, form_id, created, changed, in_draft, notes,
                                         revision, archived_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
                ON CONFLICT(sid) DO UPDATE SET
                    form_id = excluded.form_id,
                    created = excluded.created,
                    changed = excluded.changed,
                    in_draft = excluded.in_draft,
                    notes = excluded.notes,
                    revision = submissions.revision + 1,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(record.id)
            .bind(&record.form_id)
            .bind(record.created)
            .bind(record.changed)
            .bind(record.draft as i64)
            .bind(&record.notes)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        replace_elements(&mut tx, record).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteArchiveStore {
    async fn load(&self, id: RecordId) -> Result<Option<Record>> {
        load_record(&self.pool, id).await
    }
}

#[async_trait]
impl ArchiveStore for SqliteArchiveStore {
    async fn find_last_copied_id(&self) -> Result<RecordId> {
        let max: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(sid), 0) FROM submissions")
            .fetch_one(&self.pool)
            .await?;
        Ok(max)
    }

    async fn resave(&self, record: &Record, is_new: bool) -> ResaveOutcome {
        match self.write(record, is_new).await {
            Ok(()) => ResaveOutcome::Saved,
            Err(e) => ResaveOutcome::Failed {
                id: record.id,
                reason: format!("{:#}", e),
            },
        }
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ArchiveEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT sid, form_id, changed, revision, archived_at, updated_at
            FROM submissions
            ORDER BY sid ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ArchiveEntry {
                id: row.get("sid"),
                form_id: row.get("form_id"),
                changed: row.get("changed"),
                revision: row.get("revision"),
                archived_at: row.get("archived_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Pipeline state
// ═══════════════════════════════════════════════════════════════════════

/// Key/value pairs in one `key_value` collection.
pub struct SqliteKeyValue {
    pool: SqlitePool,
    collection: String,
}

impl SqliteKeyValue {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_collection(pool, STATE_COLLECTION)
    }

    pub fn with_collection(pool: SqlitePool, collection: &str) -> Self {
        Self {
            pool,
            collection: collection.to_string(),
        }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM key_value WHERE collection = ? AND name = ?")
                .bind(&self.collection)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO key_value (collection, name, value) VALUES (?, ?, ?)
            ON CONFLICT(collection, name) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(&self.collection)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
