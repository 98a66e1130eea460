//! Repeated copy batches until the backlog is drained.
//!
//! A scheduled job or deployment hook calls [`BatchRunner::step`] once per
//! invocation and carries the [`BatchState`] between invocations. A batch
//! that comes back full means more work is likely waiting, so the next
//! step moves on by one page. A short batch means the backlog is drained:
//! the state is marked finished and the offset goes back to 0 for the next
//! scheduled run.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::copy::{CopyOrchestrator, CopyResults};
use crate::models::RecordId;

/// Resumption state carried across invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchState {
    pub offset: i64,
    pub finished: bool,
}

/// Totals over one or more batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub batches: usize,
    pub attempted: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed_ids: Vec<RecordId>,
}

impl BatchSummary {
    pub fn add(&mut self, results: &CopyResults) {
        self.batches += 1;
        self.attempted += results.len();
        self.inserted += results.inserted();
        self.updated += results.updated();
        self.failed_ids.extend(results.failed_ids());
    }

    pub fn failed(&self) -> usize {
        self.failed_ids.len()
    }

    /// One-line operator feedback.
    pub fn feedback(&self) -> String {
        let mut msg = format!(
            "Archived {} records ({} new, {} updated), {} failed.",
            self.inserted + self.updated,
            self.inserted,
            self.updated,
            self.failed()
        );
        if !self.failed_ids.is_empty() {
            let ids: Vec<String> = self.failed_ids.iter().map(|id| id.to_string()).collect();
            msg.push_str(&format!(" Failed ids: {}.", ids.join(", ")));
        }
        msg
    }
}

/// Drives a [`CopyOrchestrator`] page by page.
pub struct BatchRunner<'a> {
    orchestrator: &'a CopyOrchestrator<'a>,
    limit: i64,
}

impl<'a> BatchRunner<'a> {
    /// A negative `limit` copies the whole backlog in a single step.
    ///
    /// # Errors
    ///
    /// A `limit` of 0 is rejected: such a runner would never finish.
    pub fn new(orchestrator: &'a CopyOrchestrator<'a>, limit: i64) -> Result<Self> {
        if limit == 0 {
            bail!("batch limit must not be 0");
        }
        Ok(Self {
            orchestrator,
            limit,
        })
    }

    /// Run one batch from `state` and return it with the state for the
    /// next invocation.
    pub async fn step(&self, state: BatchState) -> Result<(CopyResults, BatchState)> {
        let offset = if state.finished || self.limit < 0 {
            0
        } else {
            state.offset
        };
        let results = self.orchestrator.copy(self.limit, offset).await?;

        let next = if self.limit < 0 || (results.len() as i64) < self.limit {
            BatchState {
                offset: 0,
                finished: true,
            }
        } else {
            BatchState {
                offset: offset + self.limit,
                finished: false,
            }
        };
        Ok((results, next))
    }

    /// Step until finished or `max_batches` batches have run.
    ///
    /// Returns the totals and the state to resume from.
    pub async fn drain(&self, max_batches: usize) -> Result<(BatchSummary, BatchState)> {
        let mut summary = BatchSummary::default();
        let mut state = BatchState::default();

        for _ in 0..max_batches {
            let (results, next) = self.step(state).await?;
            summary.add(&results);
            state = next;
            if state.finished {
                break;
            }
        }

        if !state.finished {
            tracing::warn!(
                batches = summary.batches,
                offset = state.offset,
                "stopped before the backlog was drained"
            );
        }
        Ok((summary, state))
    }
}
