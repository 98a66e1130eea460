//! Storage abstraction for Forms LTS.
//!
//! The primary store and the archive share one small contract,
//! [`RecordStore`], and each adds what only it needs: the primary store
//! can be queried for changed records, the archive accepts transactional
//! per-record writes. Neither extends the other.
//!
//! ```text
//!                 ┌─────────────┐
//!                 │ RecordStore │  load(id)
//!                 └──────┬──────┘
//!          ┌─────────────┴─────────────┐
//!   ┌──────┴──────┐             ┌──────┴───────┐
//!   │ SourceStore │             │ ArchiveStore │
//!   │ changed > t │             │ max id       │
//!   │ non-draft   │             │ resave (tx)  │
//!   └─────────────┘             └──────────────┘
//! ```
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ArchiveEntry, Record, RecordId, Timestamp};

/// Operations common to the primary store and the archive.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a full record by id. `Ok(None)` if there is no such record.
    async fn load(&self, id: RecordId) -> Result<Option<Record>>;
}

/// The primary store records originate from.
#[async_trait]
pub trait SourceStore: RecordStore {
    /// Ids of non-draft records changed after `since`, ascending by change
    /// time (ties broken by id), windowed by `offset` and `limit`.
    /// A negative `limit` means no limit.
    async fn find_changed_since(
        &self,
        since: Timestamp,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecordId>>;
}

/// Result of a single-record archive write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResaveOutcome {
    /// The record was committed.
    Saved,
    /// Nothing was committed for this record.
    Failed { id: RecordId, reason: String },
}

impl ResaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, ResaveOutcome::Saved)
    }
}

/// The long term storage archive.
#[async_trait]
pub trait ArchiveStore: RecordStore {
    /// Highest record id held by the archive, 0 when it is empty.
    async fn find_last_copied_id(&self) -> Result<RecordId>;

    /// Write one record inside a transaction of its own.
    ///
    /// `is_new` selects insert (first copy) or update (later copy). Both
    /// paths are keyed by record id and may be repeated safely. A failed
    /// write is rolled back and reported as [`ResaveOutcome::Failed`].
    async fn resave(&self, record: &Record, is_new: bool) -> ResaveOutcome;

    /// Archived records, ascending by id.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ArchiveEntry>>;

    /// Number of archived records.
    async fn count(&self) -> Result<i64>;
}

/// Durable string key/value persistence for pipeline state.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
