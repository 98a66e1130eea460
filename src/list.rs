//! `lts list`: archived submissions, oldest id first.

use anyhow::Result;

use forms_lts_core::models::format_ts_iso;
use forms_lts_core::store::ArchiveStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteArchiveStore;

pub async fn run_list(config: &Config, limit: i64, offset: i64) -> Result<()> {
    let archive = SqliteArchiveStore::new(db::connect_archive(config).await?);
    let total = archive.count().await?;
    let entries = archive.list(limit, offset).await?;
    archive.pool().close().await;

    if entries.is_empty() {
        println!("No archived submissions.");
        return Ok(());
    }

    println!(
        "{:>8}  {:<24}  {:<20}  {:>3}  {:<20}",
        "sid", "form", "changed", "rev", "archived"
    );
    for entry in &entries {
        println!(
            "{:>8}  {:<24}  {:<20}  {:>3}  {:<20}",
            entry.id,
            entry.form_id,
            format_ts_iso(entry.changed),
            entry.revision,
            format_ts_iso(entry.archived_at)
        );
    }
    println!();
    println!(
        "Showing {}-{} of {}",
        offset.max(0) + 1,
        offset.max(0) + entries.len() as i64,
        total
    );
    Ok(())
}
