//! In-memory catalog for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::errors::{CatalogError, Result};
use super::types::{
    PlaylistPage, RemoteCatalog, RemoteChannel, RemoteRecord, ThumbnailCandidate, ThumbnailSet,
};

/// A remote record with a maxres thumbnail and a fixed publish time.
pub fn record(id: &str) -> RemoteRecord {
    RemoteRecord {
        external_id: id.to_string(),
        channel_external_id: Some("UC1".to_string()),
        title: format!("Title {id}"),
        duration: "PT10M".to_string(),
        live: None,
        snippet_published_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        thumbnails: ThumbnailSet {
            maxres: Some(ThumbnailCandidate {
                url: format!("https://i.ytimg.com/vi/{id}/maxresdefault.jpg"),
                width: 1280,
                height: 720,
            }),
            ..Default::default()
        },
    }
}

#[derive(Default)]
pub struct StubCatalog {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    pages: HashMap<(String, Option<String>), PlaylistPage>,
    page_failures: VecDeque<CatalogError>,
    page_calls: Vec<(String, Option<String>, u32)>,
    videos: HashMap<String, RemoteRecord>,
    failing_ids: HashSet<String>,
    batch_calls: Vec<Vec<String>>,
    channels: HashMap<String, RemoteChannel>,
    channel_calls: Vec<usize>,
}

impl StubCatalog {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("stub catalog lock")
    }

    pub fn push_page(
        &self,
        playlist: &str,
        token: Option<&str>,
        ids: &[&str],
        next: Option<&str>,
    ) {
        self.lock().pages.insert(
            (playlist.to_string(), token.map(str::to_string)),
            PlaylistPage {
                video_ids: ids.iter().map(|s| s.to_string()).collect(),
                next_page_token: next.map(str::to_string),
            },
        );
    }

    pub fn fail_next_page(&self, error: CatalogError) {
        self.lock().page_failures.push_back(error);
    }

    pub fn insert_video(&self, record: RemoteRecord) {
        self.lock().videos.insert(record.external_id.clone(), record);
    }

    pub fn fail_batch_containing(&self, id: &str) {
        self.lock().failing_ids.insert(id.to_string());
    }

    pub fn insert_channel(&self, id: &str) {
        self.lock().channels.insert(
            id.to_string(),
            RemoteChannel {
                external_id: id.to_string(),
                uploads_playlist_id: format!("UU{}", id.trim_start_matches("UC")),
                title: Some(format!("Channel {id}")),
                custom_url: Some(format!("@{}", id.to_lowercase())),
            },
        );
    }

    pub fn page_calls(&self) -> Vec<(String, Option<String>, u32)> {
        self.lock().page_calls.clone()
    }

    pub fn batch_calls(&self) -> Vec<Vec<String>> {
        self.lock().batch_calls.clone()
    }

    pub fn channel_calls(&self) -> Vec<usize> {
        self.lock().channel_calls.clone()
    }
}

#[async_trait]
impl RemoteCatalog for StubCatalog {
    async fn fetch_channels(&self, ids: &[String]) -> Result<Vec<RemoteChannel>> {
        let mut inner = self.lock();
        inner.channel_calls.push(ids.len());
        Ok(ids
            .iter()
            .filter_map(|id| inner.channels.get(id).cloned())
            .collect())
    }

    async fn fetch_playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<PlaylistPage> {
        let mut inner = self.lock();
        inner.page_calls.push((
            playlist_id.to_string(),
            page_token.map(str::to_string),
            max_results,
        ));
        if let Some(error) = inner.page_failures.pop_front() {
            return Err(error);
        }
        Ok(inner
            .pages
            .get(&(playlist_id.to_string(), page_token.map(str::to_string)))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_video_batch(&self, ids: &[String]) -> Result<Vec<RemoteRecord>> {
        let mut inner = self.lock();
        inner.batch_calls.push(ids.to_vec());
        if ids.iter().any(|id| inner.failing_ids.contains(id)) {
            return Err(CatalogError::Server {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(ids
            .iter()
            .filter_map(|id| inner.videos.get(id).cloned())
            .collect())
    }
}
