//! The sync engine.
//!
//! Both run kinds share one pipeline: fetch details in batches, load the
//! stored view, reconcile, refresh thumbnails, then write. They differ in how
//! the id set is found and whether disappearance may be acted on:
//!
//! - [`SyncEngine::run_update`] walks each tracked channel's uploads playlist
//!   and never soft-deletes, since a playlist window is only a partial view;
//! - [`SyncEngine::run_check`] re-fetches tracked videos and soft-deletes the
//!   ones the catalog no longer returns, but only when every batch came back.

mod check;
mod update;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::catalog::{
    BatchFailure, BatchOutcome, RemoteCatalog, RemoteRecord, SettledBatches, VideoBatches,
};
use crate::persistence::{ChannelRef, VideoWrite, upsert_thumbnails, upsert_videos};
use crate::reconcile::{ReconcileOutcome, SavedVideo, VideoUpdate, reconcile};
use crate::thumbnail::{ThumbnailBatch, ThumbnailJob, ThumbnailPipeline};

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{Result, SyncError, SyncOptions, SyncReport};

/// Builder for [`SyncEngine`].
#[derive(Default)]
pub struct SyncEngineBuilder {
    database: Option<Arc<DatabaseConnection>>,
    catalog: Option<Arc<dyn RemoteCatalog>>,
    pipeline: Option<ThumbnailPipeline>,
    options: Option<SyncOptions>,
    progress: Option<ProgressCallback>,
}

impl SyncEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts an owned connection or one already shared behind an `Arc`.
    pub fn database(mut self, db: impl Into<Arc<DatabaseConnection>>) -> Self {
        self.database = Some(db.into());
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn RemoteCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn pipeline(mut self, pipeline: ThumbnailPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// # Errors
    ///
    /// Returns `SyncError::Config` when a required part is missing.
    pub fn build(self) -> Result<SyncEngine> {
        let db = self
            .database
            .ok_or_else(|| SyncError::config("missing database connection"))?;
        let catalog = self
            .catalog
            .ok_or_else(|| SyncError::config("missing remote catalog"))?;
        let pipeline = self
            .pipeline
            .ok_or_else(|| SyncError::config("missing thumbnail pipeline"))?;

        Ok(SyncEngine {
            db,
            catalog,
            pipeline,
            options: self.options.unwrap_or_default(),
            progress: self.progress,
        })
    }
}

/// Runs `update` and `check` syncs against one database and catalog.
pub struct SyncEngine {
    db: Arc<DatabaseConnection>,
    catalog: Arc<dyn RemoteCatalog>,
    pipeline: ThumbnailPipeline,
    options: SyncOptions,
    progress: Option<ProgressCallback>,
}

impl SyncEngine {
    pub fn builder() -> SyncEngineBuilder {
        SyncEngineBuilder::new()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.db
    }

    fn emit(&self, event: SyncProgress) {
        emit(self.progress.as_ref(), event);
    }

    /// Check the cancel flag, marking the report when it is set.
    fn cancelled(&self, report: &mut SyncReport) -> bool {
        if self.options.is_cancelled() {
            if !report.aborted {
                tracing::info!("sync cancelled");
            }
            report.aborted = true;
        }
        report.aborted
    }

    /// Fetch details for `ids` batch by batch.
    ///
    /// Failed batches are recorded in the report and returned in
    /// `failures`; the run goes on with the rest.
    async fn fetch_details(&self, ids: &[String], report: &mut SyncReport) -> SettledBatches {
        let mut batches =
            VideoBatches::new(Arc::clone(&self.catalog), ids, self.options.batch_size);
        let mut settled = SettledBatches::default();

        while batches.has_next() {
            if self.cancelled(report) {
                break;
            }
            match batches.next_batch().await {
                Some(BatchOutcome::Fetched(records)) => {
                    self.emit(SyncProgress::FetchedBatch {
                        count: records.len(),
                        remaining: batches.remaining(),
                    });
                    settled.records.extend(records);
                }
                Some(BatchOutcome::Failed { ids, error }) => {
                    let message = crate::catalog::short_error_message(&error);
                    tracing::warn!(batch_len = ids.len(), error = %message, "detail batch failed");
                    self.emit(SyncProgress::BatchFailed {
                        ids: ids.len(),
                        error: message.clone(),
                    });
                    report.partial = true;
                    report.record_failure(
                        ids.len(),
                        format!("detail batch of {} ids: {message}", ids.len()),
                    );
                    settled.failures.push(BatchFailure { ids, error });
                }
                None => break,
            }
        }

        settled
    }

    /// Reconcile `records` against `saved`, refresh thumbnails and write.
    ///
    /// Returns the ids of saved videos absent from `records`; acting on them
    /// is up to the caller.
    async fn apply(
        &self,
        records: &[RemoteRecord],
        saved: &[SavedVideo],
        channel: Option<&ChannelRef>,
        now: DateTime<Utc>,
        report: &mut SyncReport,
    ) -> Vec<Uuid> {
        let mut outcome = reconcile(records, saved, now);
        report.processed += records.len();
        report.dropped += outcome.dropped.len();
        self.emit(SyncProgress::Reconciled {
            inserts: outcome.inserts.len(),
            updates: outcome.updates.len(),
            unavailable: outcome.unavailable_ids.len(),
            dropped: outcome.dropped.len(),
        });

        if self.cancelled(report) {
            return Vec::new();
        }

        let jobs = thumbnail_jobs(records, saved, &outcome);
        let thumbnails = if jobs.is_empty() {
            ThumbnailBatch::default()
        } else {
            self.emit(SyncProgress::ThumbnailsStarted {
                count: jobs.len(),
                concurrency: self.pipeline.options().concurrency,
            });
            self.pipeline.upload_all(jobs, now).await
        };
        self.record_thumbnail_failures(&thumbnails, report);

        if self.cancelled(report) {
            return Vec::new();
        }

        if self.options.dry_run {
            report.thumbnails += thumbnails.rows.len();
            report.inserted += outcome.inserts.len();
            report.updated += outcome.updates.len();
            return std::mem::take(&mut outcome.unavailable_ids);
        }

        let stored = upsert_thumbnails(&self.db, thumbnails.rows).await;
        report.thumbnails += stored.persisted.len();
        for stored_thumb in &stored.persisted {
            self.emit(SyncProgress::ThumbnailDone {
                external_id: stored_thumb.video_external_id.clone(),
            });
        }
        for (external_id, error) in &stored.failures {
            report.record_error(format!("{external_id}: thumbnail write failed: {error}"));
        }

        let thumbnail_ids: HashMap<String, Uuid> = stored
            .persisted
            .into_iter()
            .map(|p| (p.video_external_id, p.id))
            .collect();
        attach_thumbnails(&mut outcome, saved, &thumbnail_ids, now);

        let unavailable = std::mem::take(&mut outcome.unavailable_ids);
        let writes: Vec<VideoWrite> = outcome
            .updates
            .into_iter()
            .map(VideoWrite::Update)
            .chain(outcome.inserts.into_iter().map(VideoWrite::Insert))
            .collect();
        if writes.is_empty() {
            return unavailable;
        }

        let written = upsert_videos(&self.db, writes, channel, now).await;
        report.inserted += written.inserted.len();
        report.updated += written.updated.len();
        for failure in &written.failures {
            report.record_failure(1, format!("{}: {}", failure.external_id, failure.error));
        }
        self.emit(SyncProgress::Persisted {
            inserted: written.inserted.len(),
            updated: written.updated.len(),
            failed: written.failed_count(),
        });

        unavailable
    }

    fn record_thumbnail_failures(&self, batch: &ThumbnailBatch, report: &mut SyncReport) {
        for failure in &batch.failures {
            let message = failure.error.to_string();
            self.emit(SyncProgress::ThumbnailFailed {
                external_id: failure.external_id.clone(),
                error: message.clone(),
            });
            if failure.error.is_data_error() {
                self.emit(SyncProgress::Warning {
                    message: format!("{}: {message}", failure.external_id),
                });
            } else {
                report.record_error(format!("{}: {message}", failure.external_id));
            }
        }
    }
}

/// Thumbnail work for one reconcile pass.
///
/// New and changed videos always get a job. Unchanged videos get one only
/// when their stored thumbnail is missing, deleted or lacks an ETag.
fn thumbnail_jobs(
    records: &[RemoteRecord],
    saved: &[SavedVideo],
    outcome: &ReconcileOutcome,
) -> Vec<ThumbnailJob> {
    let saved_by_id: HashMap<&str, &SavedVideo> =
        saved.iter().map(|s| (s.external_id.as_str(), s)).collect();
    let inserted: HashSet<&str> = outcome.inserts.iter().map(|i| i.external_id.as_str()).collect();
    let updated: HashSet<&str> = outcome.updates.iter().map(|u| u.external_id.as_str()).collect();

    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for record in records {
        let id = record.external_id.as_str();
        if !seen.insert(id) {
            continue;
        }
        if inserted.contains(id) {
            jobs.push(ThumbnailJob {
                record: record.clone(),
                saved: None,
            });
            continue;
        }
        let Some(saved) = saved_by_id.get(id) else {
            continue;
        };
        let needs_repair = saved
            .thumbnail
            .as_ref()
            .is_none_or(|t| t.is_deleted() || t.etag.is_none());
        if updated.contains(id) || needs_repair {
            jobs.push(ThumbnailJob {
                record: record.clone(),
                saved: saved.thumbnail.clone(),
            });
        }
    }
    jobs
}

/// Point videos at their freshly stored thumbnails.
///
/// Videos that only changed thumbnail get a new update row.
fn attach_thumbnails(
    outcome: &mut ReconcileOutcome,
    saved: &[SavedVideo],
    thumbnail_ids: &HashMap<String, Uuid>,
    now: DateTime<Utc>,
) {
    let saved_by_id: HashMap<&str, &SavedVideo> =
        saved.iter().map(|s| (s.external_id.as_str(), s)).collect();
    let current = |external_id: &str| {
        saved_by_id
            .get(external_id)
            .and_then(|s| s.thumbnail.as_ref())
            .map(|t| t.id)
    };

    for insert in &mut outcome.inserts {
        insert.thumbnail_id = thumbnail_ids.get(&insert.external_id).copied();
    }

    let mut touched: HashSet<String> = HashSet::new();
    for update in &mut outcome.updates {
        touched.insert(update.external_id.clone());
        if let Some(&id) = thumbnail_ids.get(&update.external_id)
            && current(&update.external_id) != Some(id)
        {
            update.thumbnail_id = Some(id);
        }
    }

    for (external_id, &id) in thumbnail_ids {
        if touched.contains(external_id) || current(external_id) == Some(id) {
            continue;
        }
        if let Some(saved) = saved_by_id.get(external_id.as_str()) {
            let mut update = VideoUpdate::touch(saved.id, external_id.clone(), now);
            update.thumbnail_id = Some(id);
            outcome.updates.push(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::record;
    use crate::entity::video_kind::VideoKind;
    use crate::entity::video_status::VideoStatus;
    use crate::reconcile::SavedThumbnail;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn saved_video(id: &str, thumbnail: Option<SavedThumbnail>) -> SavedVideo {
        let rec = record(id);
        SavedVideo {
            id: Uuid::new_v4(),
            external_id: id.to_string(),
            channel_id: Uuid::new_v4(),
            title: rec.title.clone(),
            duration: rec.duration.clone(),
            published_at: rec.published_at().unwrap(),
            status: VideoStatus::Ended,
            kind: VideoKind::Standard,
            thumbnail,
            deleted_at: None,
        }
    }

    fn thumb(etag: Option<&str>) -> SavedThumbnail {
        SavedThumbnail {
            id: Uuid::new_v4(),
            path: "p.jpg".to_string(),
            width: 1280,
            height: 720,
            blur_data_url: String::new(),
            etag: etag.map(str::to_string),
            deleted_at: None,
            updated_at: now(),
        }
    }

    #[test]
    fn unchanged_video_with_healthy_thumbnail_gets_no_job() {
        let saved = vec![saved_video("v1", Some(thumb(Some("\"e\""))))];
        let records = vec![record("v1")];
        let outcome = reconcile(&records, &saved, now());
        assert!(outcome.is_empty());

        assert!(thumbnail_jobs(&records, &saved, &outcome).is_empty());
    }

    #[test]
    fn thumbnail_without_etag_gets_repair_job() {
        let saved = vec![saved_video("v1", Some(thumb(None)))];
        let records = vec![record("v1")];
        let outcome = reconcile(&records, &saved, now());

        let jobs = thumbnail_jobs(&records, &saved, &outcome);
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].saved.is_some());
    }

    #[test]
    fn new_and_changed_videos_get_jobs_once() {
        let saved = vec![saved_video("v1", Some(thumb(Some("\"e\""))))];
        let mut changed = record("v1");
        changed.title = "Renamed".to_string();
        let records = vec![changed, record("v2"), record("v2")];
        let outcome = reconcile(&records, &saved, now());

        let jobs = thumbnail_jobs(&records, &saved, &outcome);
        let ids: Vec<_> = jobs.iter().map(|j| j.record.external_id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2"]);
        assert!(jobs[1].saved.is_none());
    }

    #[test]
    fn new_thumbnail_for_unchanged_video_adds_update() {
        let saved = vec![saved_video("v1", None)];
        let mut outcome = ReconcileOutcome::default();
        let new_id = Uuid::new_v4();
        let ids = HashMap::from([("v1".to_string(), new_id)]);

        attach_thumbnails(&mut outcome, &saved, &ids, now());

        assert_eq!(outcome.updates.len(), 1);
        assert_eq!(outcome.updates[0].id, saved[0].id);
        assert_eq!(outcome.updates[0].thumbnail_id, Some(new_id));
    }

    #[test]
    fn refreshed_thumbnail_with_same_id_changes_nothing() {
        let existing = thumb(None);
        let saved = vec![saved_video("v1", Some(existing.clone()))];
        let mut outcome = ReconcileOutcome::default();
        let ids = HashMap::from([("v1".to_string(), existing.id)]);

        attach_thumbnails(&mut outcome, &saved, &ids, now());
        assert!(outcome.updates.is_empty());
    }

    #[test]
    fn builder_requires_database() {
        let err = SyncEngine::builder().build().err().expect("missing parts");
        assert!(matches!(err, SyncError::Config(_)));
    }
}
