//! Submission retrieval by id.
//!
//! Reads from the archive by default, so what an operator sees is what
//! long term storage actually holds. `--source` reads the primary copy.

use anyhow::{bail, Result};

use forms_lts_core::models::{format_ts_iso, Record, RecordId};
use forms_lts_core::store::RecordStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::{SqliteArchiveStore, SqliteSourceStore};

/// Load one submission from the archive, or from the primary database when
/// `from_source` is set.
pub async fn get_record(config: &Config, id: RecordId, from_source: bool) -> Result<Record> {
    let found = if from_source {
        let store = SqliteSourceStore::new(db::connect_source(config).await?);
        let found = store.load(id).await;
        store.pool().close().await;
        found?
    } else {
        let store = SqliteArchiveStore::new(db::connect_archive(config).await?);
        let found = store.load(id).await;
        store.pool().close().await;
        found?
    };

    match found {
        Some(record) => Ok(record),
        None if from_source => bail!("submission not found: {}", id),
        None => bail!("submission not archived: {}", id),
    }
}

pub async fn run_get(config: &Config, id: RecordId, from_source: bool, json: bool) -> Result<()> {
    let record = get_record(config, id, from_source).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("--- Submission ---");
    println!("sid:       {}", record.id);
    println!("form:      {}", record.form_id);
    println!("created:   {}", format_ts_iso(record.created));
    println!("changed:   {}", format_ts_iso(record.changed));
    if record.draft {
        println!("draft:     yes");
    }
    println!();
    println!("--- Elements ({}) ---", record.elements.len());
    for element in &record.elements {
        println!(
            "{} [{}]: {}",
            element.id, element.element_type, element.value
        );
    }
    if !record.notes.is_empty() {
        println!();
        println!("--- Notes ---");
        println!("{}", record.notes);
    }
    Ok(())
}

/// Print only the notes of an archived submission.
pub async fn run_notes(config: &Config, id: RecordId) -> Result<()> {
    let record = get_record(config, id, false).await?;
    if record.notes.is_empty() {
        println!("(no notes)");
    } else {
        println!("{}", record.notes);
    }
    Ok(())
}
