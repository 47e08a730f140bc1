use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::catalog::{ApiRateLimiter, RemoteRecord, ThumbnailCandidate, rate_limits};
use crate::http::HttpTransport;
use crate::persistence::ThumbnailRow;
use crate::reconcile::SavedThumbnail;

use super::blob::{BlobStore, THUMBNAIL_CACHE_CONTROL};
use super::blur::blur_data_url;
use super::conditional::{ConditionalFetch, fetch_conditional};
use super::errors::ThumbnailError;

/// Default number of thumbnails processed at once.
pub const DEFAULT_THUMBNAIL_CONCURRENCY: usize = 12;

/// A saved thumbnail refreshed within this window is not fetched again.
pub const REFRESH_GRACE: chrono::Duration = chrono::Duration::minutes(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Skip blob uploads. Rows are still produced.
    pub dry_run: bool,
    pub concurrency: usize,
    /// Minimum gap between task starts. Zero disables spacing.
    pub spacing: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: DEFAULT_THUMBNAIL_CONCURRENCY,
            spacing: Duration::from_millis(rate_limits::THUMBNAIL_SPACING_MS),
        }
    }
}

/// One unit of thumbnail work.
#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    pub record: RemoteRecord,
    pub saved: Option<SavedThumbnail>,
}

#[derive(Debug)]
pub struct ThumbnailFailure {
    pub external_id: String,
    pub error: ThumbnailError,
}

/// Settled results of [`ThumbnailPipeline::upload_all`].
#[derive(Debug, Default)]
#[must_use]
pub struct ThumbnailBatch {
    /// Rows to persist, one per changed thumbnail.
    pub rows: Vec<ThumbnailRow>,
    /// Jobs that needed no write.
    pub unchanged: usize,
    pub failures: Vec<ThumbnailFailure>,
}

impl ThumbnailBatch {
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// File extension for an image content type.
pub fn extension_for(content_type: &str) -> String {
    let known = match content_type {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        _ => None,
    };
    known
        .or_else(|| {
            mime_guess::get_mime_extensions_str(content_type)
                .and_then(|exts| exts.first().copied())
        })
        .unwrap_or("jpg")
        .to_string()
}

fn usable_candidate(record: &RemoteRecord) -> Result<&ThumbnailCandidate, ThumbnailError> {
    record
        .thumbnail()
        .filter(|c| !c.url.is_empty() && c.width > 0 && c.height > 0)
        .ok_or_else(|| ThumbnailError::MissingThumbnail {
            external_id: record.external_id.clone(),
        })
}

fn dimension(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Row that re-stamps a saved thumbnail without touching its image.
fn restamp(
    record: &RemoteRecord,
    saved: &SavedThumbnail,
    etag: Option<String>,
    now: DateTime<Utc>,
) -> ThumbnailRow {
    ThumbnailRow {
        id: Some(saved.id),
        video_external_id: record.external_id.clone(),
        path: saved.path.clone(),
        width: saved.width,
        height: saved.height,
        blur_data_url: saved.blur_data_url.clone(),
        etag: etag.or_else(|| saved.etag.clone()),
        deleted_at: None,
        updated_at: now,
    }
}

/// Fetches, stores and describes video thumbnails.
#[derive(Clone)]
pub struct ThumbnailPipeline {
    transport: Arc<dyn HttpTransport>,
    blob: Arc<dyn BlobStore>,
    options: PipelineOptions,
}

impl ThumbnailPipeline {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        blob: Arc<dyn BlobStore>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            transport,
            blob,
            options,
        }
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Bring one video's thumbnail up to date.
    ///
    /// Returns `None` when the stored thumbnail is current and needs no write.
    pub async fn upload(
        &self,
        record: &RemoteRecord,
        saved: Option<&SavedThumbnail>,
        now: DateTime<Utc>,
    ) -> Result<Option<ThumbnailRow>, ThumbnailError> {
        if let Some(saved) = saved
            && saved.updated_at + REFRESH_GRACE > now
        {
            return Ok(saved
                .is_deleted()
                .then(|| restamp(record, saved, None, now)));
        }

        let candidate = usable_candidate(record)?;
        let etag = saved.and_then(|s| s.etag.as_deref());

        match fetch_conditional(self.transport.as_ref(), &candidate.url, etag).await? {
            ConditionalFetch::NotModified { etag } => {
                let Some(saved) = saved else {
                    tracing::debug!(
                        external_id = %record.external_id,
                        "304 without a stored thumbnail",
                    );
                    return Ok(None);
                };
                if saved.is_deleted() || saved.etag.is_none() {
                    return Ok(Some(restamp(record, saved, etag, now)));
                }
                Ok(None)
            }
            ConditionalFetch::Fetched {
                bytes,
                content_type,
                etag,
            } => {
                let path = format!(
                    "{}/{}.{}",
                    record.external_id,
                    Uuid::new_v4().simple(),
                    extension_for(&content_type)
                );
                let blur_data_url = blur_data_url(&bytes)?;

                if self.options.dry_run {
                    tracing::debug!(path = %path, "dry run, skipping upload");
                } else {
                    self.blob
                        .put(&path, bytes, &content_type, THUMBNAIL_CACHE_CONTROL, false)
                        .await?;
                }

                Ok(Some(ThumbnailRow {
                    id: saved.map(|s| s.id),
                    video_external_id: record.external_id.clone(),
                    path,
                    width: dimension(candidate.width),
                    height: dimension(candidate.height),
                    blur_data_url,
                    etag,
                    deleted_at: None,
                    updated_at: now,
                }))
            }
        }
    }

    /// Run [`upload`](Self::upload) over many jobs with bounded concurrency.
    ///
    /// Task starts are spaced by `options.spacing`. Every task is awaited; a
    /// failed or panicked task is recorded and never cancels its siblings.
    pub async fn upload_all(&self, jobs: Vec<ThumbnailJob>, now: DateTime<Utc>) -> ThumbnailBatch {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let spacing = ApiRateLimiter::spaced(self.options.spacing);
        let mut handles: Vec<(String, JoinHandle<_>)> = Vec::with_capacity(jobs.len());

        for job in jobs {
            if let Some(limiter) = &spacing {
                limiter.wait().await;
            }
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let pipeline = self.clone();
            let external_id = job.record.external_id.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                pipeline.upload(&job.record, job.saved.as_ref(), now).await
            });
            handles.push((external_id, handle));
        }

        let mut batch = ThumbnailBatch::default();
        for (external_id, handle) in handles {
            match handle.await {
                Ok(Ok(Some(row))) => batch.rows.push(row),
                Ok(Ok(None)) => batch.unchanged += 1,
                Ok(Err(error)) => {
                    if error.is_data_error() {
                        tracing::warn!(
                            external_id = %external_id,
                            error = %error,
                            "thumbnail skipped",
                        );
                    } else {
                        tracing::warn!(
                            external_id = %external_id,
                            error = %error,
                            "thumbnail failed",
                        );
                    }
                    batch.failures.push(ThumbnailFailure { external_id, error });
                }
                Err(join_error) => {
                    tracing::error!(
                        external_id = %external_id,
                        error = %join_error,
                        "thumbnail task panicked",
                    );
                    batch.failures.push(ThumbnailFailure {
                        external_id,
                        error: ThumbnailError::Task(format!("Task panic: {join_error}")),
                    });
                }
            }
        }
        batch
    }
}
