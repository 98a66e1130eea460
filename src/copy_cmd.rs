//! `lts copy` and `lts run`.
//!
//! `copy` runs a single batch and tells the caller which offset to pass
//! next, for schedulers that invoke the tool once per tick. `run` keeps
//! stepping until the backlog is drained or `copy.max_batches` is hit.

use anyhow::Result;

use forms_lts_core::batch::{BatchRunner, BatchState};
use forms_lts_core::copy::CopyKind;
use forms_lts_core::models::format_ts_iso;

use crate::config::Config;
use crate::db::Stores;

fn kind_label(kind: CopyKind) -> &'static str {
    match kind {
        CopyKind::Insert => "insert",
        CopyKind::Update => "update",
    }
}

pub async fn run_copy(
    config: &Config,
    limit: Option<i64>,
    offset: i64,
    dry_run: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(config.copy.batch_size);
    let stores = Stores::open(config).await?;
    let orchestrator = stores.orchestrator(config);

    if dry_run {
        let previews = orchestrator.dry_run(limit, offset).await?;
        println!("copy (dry-run)");
        println!("  records found: {}", previews.len());
        for preview in &previews {
            let redacted = preview.redaction.element_ids();
            println!(
                "  {:>8}  {}  changed {}  redacts [{}]",
                preview.id,
                kind_label(preview.kind),
                format_ts_iso(preview.changed),
                redacted.join(", ")
            );
        }
        stores.close().await;
        return Ok(());
    }

    let runner = BatchRunner::new(&orchestrator, limit)?;
    let (results, next) = runner
        .step(BatchState {
            offset,
            finished: false,
        })
        .await?;

    println!("copy");
    for result in results.iter() {
        println!(
            "  {:>8}  {}  {}",
            result.id,
            kind_label(result.kind),
            if result.ok { "ok" } else { "FAILED" }
        );
    }
    println!("  attempted: {}", results.len());
    println!("  inserted: {}", results.inserted());
    println!("  updated: {}", results.updated());
    println!("  failed: {}", results.failed_ids().len());
    println!(
        "  watermark: {} ({})",
        results.watermark,
        format_ts_iso(results.watermark)
    );
    if next.finished {
        println!("  finished: backlog drained");
    } else {
        println!("  next offset: {}", next.offset);
    }

    stores.close().await;
    Ok(())
}

pub async fn run_drain(
    config: &Config,
    limit: Option<i64>,
    max_batches: Option<usize>,
) -> Result<()> {
    let limit = limit.unwrap_or(config.copy.batch_size);
    let max_batches = max_batches.unwrap_or(config.copy.max_batches);
    let stores = Stores::open(config).await?;
    let orchestrator = stores.orchestrator(config);

    let runner = BatchRunner::new(&orchestrator, limit)?;
    let (summary, state) = runner.drain(max_batches).await?;

    println!("run");
    println!("  batches: {}", summary.batches);
    println!("  {}", summary.feedback());
    if !state.finished {
        println!(
            "  stopped early; resume with `lts copy --offset {}`",
            state.offset
        );
    }

    stores.close().await;
    Ok(())
}
