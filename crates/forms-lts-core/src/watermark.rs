//! Copy progress cursor.
//!
//! The watermark is the change time of the last record processed by a
//! copy batch. Records changed after it are candidates for the next batch.
//!
//! A paged run (offset 0, then `limit`, `2 * limit`, ...) locates all of
//! its pages against the watermark as it stood when the run started, the
//! *window start*. Without it the watermark advance after the first page
//! would shift every later page and records would be skipped.
//!
//! A window may also carry a *cap*: an upper bound on the watermark for
//! the rest of the run, set when a page fails under
//! [`WatermarkPolicy::LastContiguousSuccess`](crate::copy::WatermarkPolicy).
//! Opening a new window clears it.

use anyhow::{Context, Result};

use crate::models::Timestamp;
use crate::store::KeyValueStore;

pub const LAST_CHANGE_TIMESTAMP_KEY: &str = "last_change_timestamp";
pub const WINDOW_START_KEY: &str = "window_start";
pub const WINDOW_CAP_KEY: &str = "window_cap";

/// Watermark persisted in a [`KeyValueStore`].
pub struct Watermark<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> Watermark<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Current watermark, 0 if never set.
    pub async fn get(&self) -> Result<Timestamp> {
        self.read(LAST_CHANGE_TIMESTAMP_KEY).await
    }

    /// Overwrite the watermark.
    pub async fn set(&self, ts: Timestamp) -> Result<()> {
        self.store
            .set(LAST_CHANGE_TIMESTAMP_KEY, &ts.to_string())
            .await
    }

    /// Move the watermark forward to `ts`. Never moves it back.
    ///
    /// Returns the watermark after the call.
    pub async fn advance_to(&self, ts: Timestamp) -> Result<Timestamp> {
        let current = self.get().await?;
        if ts > current {
            self.set(ts).await?;
            Ok(ts)
        } else {
            Ok(current)
        }
    }

    /// Watermark captured at the start of the current paged run.
    pub async fn window_start(&self) -> Result<Timestamp> {
        self.read(WINDOW_START_KEY).await
    }

    /// Start a new paged run at `start` and drop any cap of the previous one.
    pub async fn open_window(&self, start: Timestamp) -> Result<()> {
        self.store.set(WINDOW_START_KEY, &start.to_string()).await?;
        self.store.set(WINDOW_CAP_KEY, "").await
    }

    /// Cap on the watermark for the current window, if one was set.
    pub async fn cap(&self) -> Result<Option<Timestamp>> {
        self.read_optional(WINDOW_CAP_KEY).await
    }

    pub async fn set_cap(&self, ts: Timestamp) -> Result<()> {
        self.store.set(WINDOW_CAP_KEY, &ts.to_string()).await
    }

    async fn read(&self, key: &str) -> Result<Timestamp> {
        Ok(self.read_optional(key).await?.unwrap_or(0))
    }

    /// Missing and empty values both read as `None`.
    async fn read_optional(&self, key: &str) -> Result<Option<Timestamp>> {
        match self.store.get(key).await? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<Timestamp>()
                .map(Some)
                .with_context(|| format!("Invalid value stored under '{}': {:?}", key, raw)),
        }
    }
}
