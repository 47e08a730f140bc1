//! Cursor types over the remote catalog.
//!
//! [`PlaylistCursor`] walks a channel's uploads playlist one page at a time and
//! can be resumed from a saved page token. [`VideoBatches`] splits a list of
//! video ids into API-sized batches and yields one settled outcome per batch,
//! so a failed batch never hides the others.

use std::sync::Arc;

use super::errors::{CatalogError, Result};
use super::types::{
    MAX_IDS_PER_CALL, RemoteCatalog, RemoteChannel, RemoteRecord, dedup_ids,
};

/// How much of a playlist to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageScope {
    /// A single page holding the most recent uploads.
    #[default]
    Recent,
    /// Every page until the catalog stops returning a next-page token.
    All,
}

impl PageScope {
    /// Requested page size.
    pub fn page_size(self) -> u32 {
        match self {
            PageScope::Recent => 20,
            PageScope::All => 50,
        }
    }

    fn follows_tokens(self) -> bool {
        matches!(self, PageScope::All)
    }
}

/// Lazy, finite, resumable walk over a playlist's video ids.
///
/// ```ignore
/// let mut cursor = PlaylistCursor::new(catalog, "UUxyz", PageScope::All);
/// while let Some(ids) = cursor.next_page().await? {
///     save_checkpoint(cursor.page_token());
///     handle(ids);
/// }
/// ```
pub struct PlaylistCursor {
    catalog: Arc<dyn RemoteCatalog>,
    playlist_id: String,
    scope: PageScope,
    page_token: Option<String>,
    exhausted: bool,
    pages_read: u32,
}

impl PlaylistCursor {
    pub fn new(
        catalog: Arc<dyn RemoteCatalog>,
        playlist_id: impl Into<String>,
        scope: PageScope,
    ) -> Self {
        Self {
            catalog,
            playlist_id: playlist_id.into(),
            scope,
            page_token: None,
            exhausted: false,
            pages_read: 0,
        }
    }

    /// Continue a previous walk from the token it reported.
    pub fn resume(
        catalog: Arc<dyn RemoteCatalog>,
        playlist_id: impl Into<String>,
        scope: PageScope,
        page_token: impl Into<String>,
    ) -> Self {
        let mut cursor = Self::new(catalog, playlist_id, scope);
        cursor.page_token = Some(page_token.into());
        cursor
    }

    pub fn has_next(&self) -> bool {
        !self.exhausted
    }

    /// Token that the next call to [`next_page`](Self::next_page) will send.
    pub fn page_token(&self) -> Option<&str> {
        self.page_token.as_deref()
    }

    pub fn pages_read(&self) -> u32 {
        self.pages_read
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the walk is over. On error the cursor is left
    /// where it was, so calling again retries the same page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .catalog
            .fetch_playlist_page(
                &self.playlist_id,
                self.page_token.as_deref(),
                self.scope.page_size(),
            )
            .await?;
        self.pages_read += 1;

        if page.video_ids.is_empty() {
            self.exhausted = true;
            self.page_token = None;
            return Ok(None);
        }

        self.page_token = page.next_page_token;
        if !self.scope.follows_tokens() || self.page_token.is_none() {
            self.exhausted = true;
        }

        Ok(Some(page.video_ids))
    }

    /// Drain the remaining pages into one list.
    pub async fn collect_all(mut self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        while let Some(page) = self.next_page().await? {
            ids.extend(page);
        }
        Ok(ids)
    }
}

/// Every video id in a playlist within `scope`.
pub async fn list_uploaded_video_ids(
    catalog: Arc<dyn RemoteCatalog>,
    playlist_id: &str,
    scope: PageScope,
) -> Result<Vec<String>> {
    PlaylistCursor::new(catalog, playlist_id, scope)
        .collect_all()
        .await
}

/// Channel details for any number of channel ids, chunked per call.
pub async fn fetch_channel_details(
    catalog: &dyn RemoteCatalog,
    ids: &[String],
) -> Result<Vec<RemoteChannel>> {
    let ids = dedup_ids(ids);
    let mut channels = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_IDS_PER_CALL) {
        channels.extend(catalog.fetch_channels(chunk).await?);
    }
    Ok(channels)
}

/// Result of fetching one batch of video details.
#[derive(Debug)]
pub enum BatchOutcome {
    Fetched(Vec<RemoteRecord>),
    Failed {
        ids: Vec<String>,
        error: CatalogError,
    },
}

/// A batch that could not be fetched.
#[derive(Debug)]
pub struct BatchFailure {
    pub ids: Vec<String>,
    pub error: CatalogError,
}

/// All batch outcomes of one walk.
#[derive(Debug, Default)]
pub struct SettledBatches {
    pub records: Vec<RemoteRecord>,
    pub failures: Vec<BatchFailure>,
}

impl SettledBatches {
    /// True when every batch succeeded, i.e. `records` is the complete
    /// remote view of the requested ids.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failures
            .iter()
            .flat_map(|f| f.ids.iter().map(String::as_str))
    }
}

/// Lazy batched fetch of video details.
pub struct VideoBatches {
    catalog: Arc<dyn RemoteCatalog>,
    ids: Vec<String>,
    batch_size: usize,
    position: usize,
}

impl VideoBatches {
    /// `batch_size` is clamped to `1..=50`.
    pub fn new(catalog: Arc<dyn RemoteCatalog>, ids: &[String], batch_size: usize) -> Self {
        Self {
            catalog,
            ids: dedup_ids(ids),
            batch_size: batch_size.clamp(1, MAX_IDS_PER_CALL),
            position: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.position < self.ids.len()
    }

    pub fn remaining(&self) -> usize {
        self.ids.len() - self.position
    }

    pub fn batch_count(&self) -> usize {
        self.ids.len().div_ceil(self.batch_size)
    }

    pub async fn next_batch(&mut self) -> Option<BatchOutcome> {
        if !self.has_next() {
            return None;
        }

        let end = (self.position + self.batch_size).min(self.ids.len());
        let batch = &self.ids[self.position..end];
        self.position = end;

        Some(match self.catalog.fetch_video_batch(batch).await {
            Ok(records) => BatchOutcome::Fetched(records),
            Err(error) => BatchOutcome::Failed {
                ids: batch.to_vec(),
                error,
            },
        })
    }

    /// Fetch every remaining batch, keeping successes and failures apart.
    pub async fn collect_settled(mut self) -> SettledBatches {
        let mut settled = SettledBatches::default();
        while let Some(outcome) = self.next_batch().await {
            match outcome {
                BatchOutcome::Fetched(records) => settled.records.extend(records),
                BatchOutcome::Failed { ids, error } => {
                    tracing::warn!(
                        batch_len = ids.len(),
                        error = %error,
                        "video detail batch failed"
                    );
                    settled.failures.push(BatchFailure { ids, error });
                }
            }
        }
        settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{StubCatalog, record};

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("v{i}")).collect()
    }

    #[tokio::test]
    async fn recent_scope_reads_single_page_of_twenty() {
        let catalog = Arc::new(StubCatalog::default());
        catalog.push_page("UU1", None, &["a", "b"], Some("p2"));

        let mut cursor = PlaylistCursor::new(catalog.clone(), "UU1", PageScope::Recent);
        assert!(cursor.has_next());
        let page = cursor.next_page().await.unwrap();
        assert_eq!(page, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(!cursor.has_next());
        assert_eq!(cursor.next_page().await.unwrap(), None);

        assert_eq!(catalog.page_calls(), vec![("UU1".to_string(), None, 20)]);
    }

    #[tokio::test]
    async fn all_scope_follows_tokens_until_absent() {
        let catalog = Arc::new(StubCatalog::default());
        catalog.push_page("UU1", None, &["a"], Some("p2"));
        catalog.push_page("UU1", Some("p2"), &["b"], Some("p3"));
        catalog.push_page("UU1", Some("p3"), &["c"], None);

        let ids = list_uploaded_video_ids(catalog.clone(), "UU1", PageScope::All)
            .await
            .unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let calls = catalog.page_calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, _, size)| *size == 50));
    }

    #[tokio::test]
    async fn empty_page_ends_walk_even_with_token() {
        let catalog = Arc::new(StubCatalog::default());
        catalog.push_page("UU1", None, &[], Some("p2"));

        let mut cursor = PlaylistCursor::new(catalog.clone(), "UU1", PageScope::All);
        assert_eq!(cursor.next_page().await.unwrap(), None);
        assert!(!cursor.has_next());
        assert_eq!(catalog.page_calls().len(), 1);
    }

    #[tokio::test]
    async fn cursor_resumes_from_saved_token() {
        let catalog = Arc::new(StubCatalog::default());
        catalog.push_page("UU1", None, &["a"], Some("p2"));
        catalog.push_page("UU1", Some("p2"), &["b"], None);

        let mut first = PlaylistCursor::new(catalog.clone(), "UU1", PageScope::All);
        first.next_page().await.unwrap();
        let token = first.page_token().unwrap().to_string();
        drop(first);

        let resumed = PlaylistCursor::resume(catalog.clone(), "UU1", PageScope::All, token);
        assert_eq!(resumed.collect_all().await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn failed_page_leaves_cursor_in_place() {
        let catalog = Arc::new(StubCatalog::default());
        catalog.fail_next_page(CatalogError::network("timeout"));
        catalog.push_page("UU1", None, &["a"], None);

        let mut cursor = PlaylistCursor::new(catalog.clone(), "UU1", PageScope::All);
        assert!(cursor.next_page().await.is_err());
        assert!(cursor.has_next());
        assert_eq!(cursor.page_token(), None);
        assert_eq!(cursor.next_page().await.unwrap(), Some(vec!["a".to_string()]));
    }

    #[tokio::test]
    async fn video_batches_chunk_by_fifty() {
        let catalog = Arc::new(StubCatalog::default());
        for id in ids(120) {
            catalog.insert_video(record(&id));
        }

        let batches = VideoBatches::new(catalog.clone(), &ids(120), 50);
        assert_eq!(batches.batch_count(), 3);
        let settled = batches.collect_settled().await;

        assert!(settled.is_complete());
        assert_eq!(settled.records.len(), 120);
        let sizes: Vec<usize> = catalog.batch_calls().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
    }

    #[tokio::test]
    async fn failed_batch_is_isolated() {
        let catalog = Arc::new(StubCatalog::default());
        for id in ids(6) {
            catalog.insert_video(record(&id));
        }
        catalog.fail_batch_containing("v3");

        let settled = VideoBatches::new(catalog, &ids(6), 2).collect_settled().await;

        assert!(!settled.is_complete());
        assert_eq!(settled.records.len(), 4);
        let failed: Vec<&str> = settled.failed_ids().collect();
        assert_eq!(failed, vec!["v2", "v3"]);
    }

    #[tokio::test]
    async fn batch_size_is_clamped_and_ids_deduplicated() {
        let catalog = Arc::new(StubCatalog::default());
        let mut input = ids(3);
        input.push("v0".to_string());

        let batches = VideoBatches::new(catalog, &input, 500);
        assert_eq!(batches.remaining(), 3);
        assert_eq!(batches.batch_count(), 1);

        let catalog = Arc::new(StubCatalog::default());
        assert_eq!(VideoBatches::new(catalog, &ids(3), 0).batch_count(), 3);
    }

    #[tokio::test]
    async fn channel_details_are_chunked() {
        let catalog = StubCatalog::default();
        let channel_ids: Vec<String> = (0..60).map(|i| format!("UC{i}")).collect();
        for id in &channel_ids {
            catalog.insert_channel(id);
        }

        let channels = fetch_channel_details(&catalog, &channel_ids).await.unwrap();
        assert_eq!(channels.len(), 60);
        assert_eq!(catalog.channel_calls(), vec![50, 10]);
    }
}
