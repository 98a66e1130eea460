//! Incremental, redacting copy from the primary store into the archive.
//!
//! One call to [`CopyOrchestrator::copy`] is one batch:
//!
//! 1. Read the highest id already archived.
//! 2. Locate up to `limit` non-draft records changed since the watermark.
//! 3. For each, oldest change first: load, redact, and write it to the
//!    archive in a transaction of its own. Ids above the highest archived
//!    id are inserts, the rest are updates. A failed record is logged and
//!    the batch moves on.
//! 4. Advance the watermark according to the [`WatermarkPolicy`].
//!
//! The batch as a whole is not atomic. A crash part way leaves the records
//! written so far in the archive and the watermark where it was, so the
//! next batch copies the same window again. Writes are keyed by id, which
//! makes that repetition harmless.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::locator::SourceRecordLocator;
use crate::models::{RecordId, RedactionResult, Timestamp};
use crate::redact::RedactionEngine;
use crate::store::{ArchiveStore, KeyValueStore, ResaveOutcome, SourceStore};
use crate::watermark::Watermark;

/// Default batch size.
pub const COPY_LIMIT: i64 = 50;

/// How far the watermark moves after a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkPolicy {
    /// To the change time of the last record attempted, whether or not it
    /// was written. Failed records are not retried by later batches unless
    /// they change again.
    #[default]
    LastAttempted,
    /// To the change time of the last record written before the first
    /// failure. The failed record and everything after it are retried.
    /// A failure caps the watermark for the remaining pages of the run.
    LastContiguousSuccess,
}

/// Whether a record was copied as a first copy or over an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyKind {
    Insert,
    Update,
}

impl CopyKind {
    pub fn is_new(self) -> bool {
        self == CopyKind::Insert
    }
}

/// Outcome for one record of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyResult {
    pub id: RecordId,
    pub kind: CopyKind,
    pub ok: bool,
    /// Change time of the source record, if it could be loaded.
    pub changed: Option<Timestamp>,
}

/// Outcome of one batch, in copy order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyResults {
    entries: Vec<CopyResult>,
    /// Watermark after the batch.
    pub watermark: Timestamp,
}

impl CopyResults {
    /// Number of records attempted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Success flag for `id`, if it was part of the batch.
    pub fn get(&self, id: RecordId) -> Option<bool> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.ok)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CopyResult> {
        self.entries.iter()
    }

    /// Per-id success map.
    pub fn as_map(&self) -> BTreeMap<RecordId, bool> {
        self.entries.iter().map(|e| (e.id, e.ok)).collect()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn failed_ids(&self) -> Vec<RecordId> {
        self.entries.iter().filter(|e| !e.ok).map(|e| e.id).collect()
    }

    pub fn inserted(&self) -> usize {
        self.count(CopyKind::Insert)
    }

    pub fn updated(&self) -> usize {
        self.count(CopyKind::Update)
    }

    fn count(&self, kind: CopyKind) -> usize {
        self.entries.iter().filter(|e| e.ok && e.kind == kind).count()
    }

    /// Change time the watermark moves to under `policy`, if any.
    fn watermark_target(&self, policy: WatermarkPolicy) -> Option<Timestamp> {
        match policy {
            WatermarkPolicy::LastAttempted => {
                self.entries.iter().rev().find_map(|e| e.changed)
            }
            WatermarkPolicy::LastContiguousSuccess => self
                .entries
                .iter()
                .take_while(|e| e.ok)
                .filter_map(|e| e.changed)
                .last(),
        }
    }
}

/// What a batch would do, without doing it.
#[derive(Debug, Clone, Serialize)]
pub struct CopyPreview {
    pub id: RecordId,
    pub kind: CopyKind,
    pub changed: Timestamp,
    pub redaction: RedactionResult,
}

/// Runs copy batches from a [`SourceStore`] into an [`ArchiveStore`].
pub struct CopyOrchestrator<'a> {
    source: &'a dyn SourceStore,
    archive: &'a dyn ArchiveStore,
    state: &'a dyn KeyValueStore,
    policy: WatermarkPolicy,
}

impl<'a> CopyOrchestrator<'a> {
    pub fn new(
        source: &'a dyn SourceStore,
        archive: &'a dyn ArchiveStore,
        state: &'a dyn KeyValueStore,
    ) -> Self {
        Self {
            source,
            archive,
            state,
            policy: WatermarkPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: WatermarkPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Copy one batch of at most `limit` records, skipping the first
    /// `offset` candidates of the current run. A negative `limit` copies
    /// every candidate.
    ///
    /// # Errors
    ///
    /// Fails before anything is written if either store or the state
    /// store cannot be reached. Failures of individual records are
    /// reported in the results instead.
    pub async fn copy(&self, limit: i64, offset: i64) -> Result<CopyResults> {
        let watermark = Watermark::new(self.state);
        let locator = SourceRecordLocator::new(self.source, self.archive, &watermark);

        let last_copied_id = locator.find_last_copied_source_id().await?;
        let targets = locator.find_copy_targets(limit, offset).await?;
        tracing::info!(
            targets = targets.len(),
            last_copied_id,
            offset,
            "copy batch located"
        );

        let mut results = CopyResults::default();
        for id in targets {
            let kind = if id > last_copied_id {
                CopyKind::Insert
            } else {
                CopyKind::Update
            };
            results.entries.push(self.copy_record(id, kind).await);
        }

        results.watermark = self.advance_watermark(&watermark, &results).await?;

        tracing::info!(
            attempted = results.len(),
            failed = results.failed_ids().len(),
            watermark = results.watermark,
            "copy batch done"
        );
        Ok(results)
    }

    /// Locate and redact the next batch without writing anything.
    pub async fn dry_run(&self, limit: i64, offset: i64) -> Result<Vec<CopyPreview>> {
        let watermark = Watermark::new(self.state);
        let locator = SourceRecordLocator::new(self.source, self.archive, &watermark);

        let last_copied_id = locator.find_last_copied_source_id().await?;
        let targets = locator.peek_copy_targets(limit, offset).await?;

        let mut previews = Vec::with_capacity(targets.len());
        for id in targets {
            let Some(record) = self.source.load(id).await? else {
                continue;
            };
            let (_, redaction) = RedactionEngine::redact(&record);
            previews.push(CopyPreview {
                id,
                kind: if id > last_copied_id {
                    CopyKind::Insert
                } else {
                    CopyKind::Update
                },
                changed: record.changed,
                redaction,
            });
        }
        Ok(previews)
    }

    async fn advance_watermark(
        &self,
        watermark: &Watermark<'_>,
        results: &CopyResults,
    ) -> Result<Timestamp> {
        let mut target = results.watermark_target(self.policy);

        if self.policy == WatermarkPolicy::LastContiguousSuccess {
            match watermark.cap().await? {
                Some(cap) => target = target.map(|ts| ts.min(cap)),
                None if !results.failed_ids().is_empty() => {
                    let cap = match target {
                        Some(ts) => ts,
                        None => watermark.get().await?,
                    };
                    tracing::info!(cap, "failure in window, watermark capped for the run");
                    watermark.set_cap(cap).await?;
                }
                None => {}
            }
        }

        match target {
            Some(ts) => watermark.advance_to(ts).await,
            None => watermark.get().await,
        }
    }

    async fn copy_record(&self, id: RecordId, kind: CopyKind) -> CopyResult {
        let mut record = match self.source.load(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(sid = id, "record disappeared from the source store");
                return CopyResult {
                    id,
                    kind,
                    ok: false,
                    changed: None,
                };
            }
            Err(e) => {
                tracing::error!(sid = id, error = %e, "failed to load record");
                return CopyResult {
                    id,
                    kind,
                    ok: false,
                    changed: None,
                };
            }
        };

        let redaction = RedactionEngine::redact_in_place(&mut record);
        let ok = match self.archive.resave(&record, kind.is_new()).await {
            ResaveOutcome::Saved => {
                tracing::debug!(
                    sid = id,
                    is_new = kind.is_new(),
                    redacted = redaction.fully_redacted.len(),
                    partly_redacted = redaction.partially_redacted.len(),
                    "record archived"
                );
                true
            }
            ResaveOutcome::Failed { id, reason } => {
                tracing::error!(sid = id, is_new = kind.is_new(), %reason, "failed to add/edit record");
                false
            }
        };

        CopyResult {
            id,
            kind,
            ok,
            changed: Some(record.changed),
        }
    }
}
