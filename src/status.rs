//! `lts status`: where the copy pipeline stands.

use anyhow::Result;

use forms_lts_core::models::format_ts_iso;
use forms_lts_core::store::ArchiveStore;
use forms_lts_core::watermark::Watermark;

use crate::config::Config;
use crate::db::Stores;

pub async fn run_status(config: &Config) -> Result<()> {
    let stores = Stores::open(config).await?;
    let watermark = Watermark::new(&stores.state);

    let current = watermark.get().await?;
    let window_start = watermark.window_start().await?;
    let last_copied = stores.archive.find_last_copied_id().await?;
    let archived = stores.archive.count().await?;
    let pending = stores.source.count_changed_since(current).await?;

    println!("Forms LTS status");
    println!("================");
    println!();
    println!("  Primary:        {}", config.source.path.display());
    println!("  Archive:        {}", config.archive.path.display());
    println!();
    println!("  Watermark:      {} ({})", current, format_ts_iso(current));
    println!(
        "  Window start:   {} ({})",
        window_start,
        format_ts_iso(window_start)
    );
    println!("  Last copied id: {}", last_copied);
    println!("  Archived:       {}", archived);
    println!("  Pending:        {}", pending);
    println!("  Policy:         {:?}", config.copy.watermark_policy);

    stores.close().await;
    Ok(())
}
