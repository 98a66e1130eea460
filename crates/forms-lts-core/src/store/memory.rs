//! In-memory store implementations for tests and embedding.
//!
//! Uses `BTreeMap` behind `std::sync::RwLock` for thread safety. The
//! archive can be told to fail writes for chosen ids, or to act as if it
//! were unreachable, and keeps a log of every `resave` call.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{ArchiveEntry, Record, RecordId, Timestamp};

use super::{ArchiveStore, KeyValueStore, RecordStore, ResaveOutcome, SourceStore};

fn window<T>(items: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    let items = items.skip(offset.max(0) as usize);
    if limit < 0 {
        items.collect()
    } else {
        items.take(limit as usize).collect()
    }
}

/// In-memory primary store.
pub struct InMemorySourceStore {
    records: RwLock<BTreeMap<RecordId, Record>>,
    unavailable: AtomicBool,
}

impl InMemorySourceStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: Record) {
        self.records.write().unwrap().insert(record.id, record);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("source store unavailable");
        }
        Ok(())
    }
}

impl Default for InMemorySourceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemorySourceStore {
    async fn load(&self, id: RecordId) -> Result<Option<Record>> {
        self.check_available()?;
        Ok(self.records.read().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl SourceStore for InMemorySourceStore {
    async fn find_changed_since(
        &self,
        since: Timestamp,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecordId>> {
        self.check_available()?;
        let records = self.records.read().unwrap();
        let mut eligible: Vec<(Timestamp, RecordId)> = records
            .values()
            .filter(|r| !r.draft && r.changed > since)
            .map(|r| (r.changed, r.id))
            .collect();
        eligible.sort();
        Ok(window(eligible.into_iter().map(|(_, id)| id), limit, offset))
    }
}

struct StoredRecord {
    record: Record,
    revision: i64,
    archived_at: Timestamp,
    updated_at: Timestamp,
}

/// In-memory archive.
pub struct InMemoryArchiveStore {
    records: RwLock<BTreeMap<RecordId, StoredRecord>>,
    failing: RwLock<BTreeSet<RecordId>>,
    resaves: RwLock<Vec<(RecordId, bool)>>,
    unavailable: AtomicBool,
}

impl InMemoryArchiveStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            failing: RwLock::new(BTreeSet::new()),
            resaves: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every `resave` of `id` fail until [`heal`](Self::heal) is called.
    pub fn fail_writes_for(&self, id: RecordId) {
        self.failing.write().unwrap().insert(id);
    }

    pub fn heal(&self, id: RecordId) {
        self.failing.write().unwrap().remove(&id);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every `resave` call so far as `(id, is_new)`, in call order.
    pub fn resave_calls(&self) -> Vec<(RecordId, bool)> {
        self.resaves.read().unwrap().clone()
    }

    pub fn revision(&self, id: RecordId) -> Option<i64> {
        self.records.read().unwrap().get(&id).map(|s| s.revision)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("archive store unavailable");
        }
        Ok(())
    }
}

impl Default for InMemoryArchiveStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryArchiveStore {
    async fn load(&self, id: RecordId) -> Result<Option<Record>> {
        self.check_available()?;
        Ok(self
            .records
            .read()
            .unwrap()
            .get(&id)
            .map(|s| s.record.clone()))
    }
}

#[async_trait]
impl ArchiveStore for InMemoryArchiveStore {
    async fn find_last_copied_id(&self) -> Result<RecordId> {
        self.check_available()?;
        Ok(self
            .records
            .read()
            .unwrap()
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0))
    }

    async fn resave(&self, record: &Record, is_new: bool) -> ResaveOutcome {
        self.resaves.write().unwrap().push((record.id, is_new));

        if self.unavailable.load(Ordering::SeqCst) || self.failing.read().unwrap().contains(&record.id)
        {
            return ResaveOutcome::Failed {
                id: record.id,
                reason: "write rejected".to_string(),
            };
        }

        let now = chrono::Utc::now().timestamp();
        let mut records = self.records.write().unwrap();
        match records.get_mut(&record.id) {
            Some(stored) => {
                stored.record = record.clone();
                stored.revision += 1;
                stored.updated_at = now;
            }
            None => {
                records.insert(
                    record.id,
                    StoredRecord {
                        record: record.clone(),
                        revision: 1,
                        archived_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        ResaveOutcome::Saved
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ArchiveEntry>> {
        self.check_available()?;
        let records = self.records.read().unwrap();
        let entries = records.values().map(|s| ArchiveEntry {
            id: s.record.id,
            form_id: s.record.form_id.clone(),
            changed: s.record.changed,
            revision: s.revision,
            archived_at: s.archived_at,
            updated_at: s.updated_at,
        });
        Ok(window(entries, limit, offset))
    }

    async fn count(&self) -> Result<i64> {
        self.check_available()?;
        Ok(self.records.read().unwrap().len() as i64)
    }
}

/// In-memory key/value store.
#[derive(Default)]
pub struct InMemoryKeyValue {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryKeyValue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
