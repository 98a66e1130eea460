//! Change detection: which records does the next batch copy?

use anyhow::Result;

use crate::models::RecordId;
use crate::store::{ArchiveStore, SourceStore};
use crate::watermark::Watermark;

/// Finds copy candidates in the primary store.
pub struct SourceRecordLocator<'a> {
    source: &'a dyn SourceStore,
    archive: &'a dyn ArchiveStore,
    watermark: &'a Watermark<'a>,
}

impl<'a> SourceRecordLocator<'a> {
    pub fn new(
        source: &'a dyn SourceStore,
        archive: &'a dyn ArchiveStore,
        watermark: &'a Watermark<'a>,
    ) -> Self {
        Self {
            source,
            archive,
            watermark,
        }
    }

    /// Highest id already in the archive. Ids above it are new to the
    /// archive, ids at or below it are updates.
    pub async fn find_last_copied_source_id(&self) -> Result<RecordId> {
        self.archive.find_last_copied_id().await
    }

    /// Non-draft records changed since the watermark, oldest change first.
    ///
    /// With `offset == 0` a new paged run starts and the current watermark
    /// becomes its window start. Later pages (`offset > 0`) keep locating
    /// against that window start. A negative `limit` means no limit.
    ///
    /// The window is only recorded once the primary store has answered.
    pub async fn find_copy_targets(&self, limit: i64, offset: i64) -> Result<Vec<RecordId>> {
        if offset > 0 {
            let since = self.watermark.window_start().await?;
            return self.source.find_changed_since(since, limit, offset).await;
        }
        let since = self.watermark.get().await?;
        let targets = self.source.find_changed_since(since, limit, 0).await?;
        self.watermark.open_window(since).await?;
        Ok(targets)
    }

    /// Same window as [`find_copy_targets`](Self::find_copy_targets) but
    /// without opening a new run. Writes nothing.
    pub async fn peek_copy_targets(&self, limit: i64, offset: i64) -> Result<Vec<RecordId>> {
        let since = if offset <= 0 {
            self.watermark.get().await?
        } else {
            self.watermark.window_start().await?
        };
        self.source
            .find_changed_since(since, limit, offset.max(0))
            .await
    }
}
