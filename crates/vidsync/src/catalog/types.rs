use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::Result;

/// Maximum number of ids accepted by a single detail or channel lookup.
pub const MAX_IDS_PER_CALL: usize = 50;

/// Live-broadcast timing reported for a video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveStreamingDetails {
    pub scheduled_start: Option<DateTime<Utc>>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
}

/// A thumbnail rendition with known dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailCandidate {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Thumbnail renditions the engine considers, highest resolution first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThumbnailSet {
    pub maxres: Option<ThumbnailCandidate>,
    pub standard: Option<ThumbnailCandidate>,
    pub high: Option<ThumbnailCandidate>,
}

impl ThumbnailSet {
    /// Highest available rendition: maxres, then standard, then high.
    pub fn best(&self) -> Option<&ThumbnailCandidate> {
        self.maxres
            .as_ref()
            .or(self.standard.as_ref())
            .or(self.high.as_ref())
    }
}

/// A video as currently reported by the remote catalog.
///
/// Lives for one sync run; never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub external_id: String,
    pub channel_external_id: Option<String>,
    pub title: String,
    /// ISO-8601 duration, `P0D` when the catalog omits it.
    pub duration: String,
    pub live: Option<LiveStreamingDetails>,
    /// Generic publish timestamp from the snippet.
    pub snippet_published_at: Option<DateTime<Utc>>,
    pub thumbnails: ThumbnailSet,
}

impl RemoteRecord {
    /// Publication instant: actual start, else scheduled start, else the
    /// snippet timestamp. First present value wins.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        let live = self.live.as_ref();
        live.and_then(|l| l.actual_start)
            .or_else(|| live.and_then(|l| l.scheduled_start))
            .or(self.snippet_published_at)
    }

    pub fn thumbnail(&self) -> Option<&ThumbnailCandidate> {
        self.thumbnails.best()
    }
}

/// A tracked channel as reported by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChannel {
    pub external_id: String,
    /// Reference to the channel's uploads playlist.
    pub uploads_playlist_id: String,
    pub title: Option<String>,
    pub custom_url: Option<String>,
}

/// One page of a playlist listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistPage {
    pub video_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Read access to a remote video catalog.
///
/// Implementations perform exactly one logical request per call (after
/// internal retries). Batching and pagination live in the cursor types in
/// [`super::pagination`].
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Channel details for up to [`MAX_IDS_PER_CALL`] channel ids.
    ///
    /// Channels that no longer exist or lack an uploads playlist are omitted.
    async fn fetch_channels(&self, ids: &[String]) -> Result<Vec<RemoteChannel>>;

    /// One page of the playlist, starting at `page_token` when given.
    async fn fetch_playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<PlaylistPage>;

    /// Details for up to [`MAX_IDS_PER_CALL`] video ids.
    ///
    /// Unavailable (deleted, private) videos are simply absent from the result.
    async fn fetch_video_batch(&self, ids: &[String]) -> Result<Vec<RemoteRecord>>;
}

/// Drop duplicate ids, keeping the first occurrence.
pub(crate) fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
