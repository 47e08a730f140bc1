use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::short_error_message;
use crate::persistence::{
    SoftDeleteTarget, load_saved_videos, load_tracked_external_ids,
    soft_delete_orphaned_thumbnails, soft_delete_videos,
};
use crate::reconcile::SavedVideo;

use super::super::progress::SyncProgress;
use super::super::types::{CheckMode, Result, SyncReport};
use super::SyncEngine;

impl SyncEngine {
    /// Re-check tracked videos against the catalog.
    ///
    /// Changed videos are updated. Videos the catalog no longer returns are
    /// soft-deleted, but only when every detail batch succeeded; otherwise
    /// the report is marked partial and nothing is deleted.
    ///
    /// # Errors
    ///
    /// Fails only when the tracked or saved videos cannot be loaded.
    pub async fn run_check(&self, mode: CheckMode, now: DateTime<Utc>) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let ids = load_tracked_external_ids(&self.db, mode).await?;
        tracing::info!(mode = ?mode, tracked = ids.len(), "checking tracked videos");
        if ids.is_empty() {
            return Ok(report);
        }

        let settled = self.fetch_details(&ids, &mut report).await;
        if report.aborted {
            return Ok(report);
        }

        let saved = load_saved_videos(&self.db, &ids).await?;
        let unavailable = self
            .apply(&settled.records, &saved, None, now, &mut report)
            .await;
        if report.aborted {
            return Ok(report);
        }

        if !unavailable.is_empty() {
            if settled.is_complete() {
                self.remove_unavailable(&unavailable, &saved, now, &mut report)
                    .await;
            } else {
                tracing::warn!(
                    candidates = unavailable.len(),
                    failed_batches = settled.failures.len(),
                    "remote view incomplete, skipping soft delete"
                );
                self.emit(SyncProgress::SoftDeleteSkipped {
                    candidates: unavailable.len(),
                    failed_batches: settled.failures.len(),
                });
                report.partial = true;
            }
        }

        if !self.options.dry_run {
            match soft_delete_orphaned_thumbnails(&self.db, now).await {
                Ok(swept) if !swept.is_empty() => {
                    tracing::info!(count = swept.len(), "soft-deleted orphaned thumbnails");
                }
                Ok(_) => {}
                Err(e) => report.record_error(format!(
                    "orphaned thumbnail sweep failed: {}",
                    short_error_message(&e)
                )),
            }
        }

        Ok(report)
    }

    async fn remove_unavailable(
        &self,
        unavailable: &[Uuid],
        saved: &[SavedVideo],
        now: DateTime<Utc>,
        report: &mut SyncReport,
    ) {
        if self.options.dry_run {
            report.deleted += unavailable.len();
            return;
        }

        let targets = delete_targets(unavailable, saved);
        let outcome = soft_delete_videos(&self.db, &targets, now).await;
        report.deleted += outcome.deleted.len();
        for (video_id, error) in &outcome.failed {
            report.record_failure(1, format!("video {video_id}: soft delete failed: {error}"));
        }
        self.emit(SyncProgress::SoftDeleted {
            count: outcome.deleted.len(),
        });
    }
}

/// Pair each video with its live thumbnail, if any.
fn delete_targets(unavailable: &[Uuid], saved: &[SavedVideo]) -> Vec<SoftDeleteTarget> {
    unavailable
        .iter()
        .map(|&video_id| SoftDeleteTarget {
            video_id,
            thumbnail_id: saved
                .iter()
                .find(|s| s.id == video_id)
                .and_then(|s| s.thumbnail.as_ref())
                .filter(|t| !t.is_deleted())
                .map(|t| t.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;
    use crate::catalog::testing::StubCatalog;
    use crate::entity::video;
    use crate::entity::video_kind::VideoKind;
    use crate::entity::video_status::VideoStatus;
    use crate::http::MockTransport;
    use crate::reconcile::SavedThumbnail;
    use crate::sync::SyncOptions;
    use crate::thumbnail::{MemoryBlobStore, ThumbnailPipeline};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn saved(thumbnail: Option<SavedThumbnail>) -> SavedVideo {
        SavedVideo {
            id: Uuid::new_v4(),
            external_id: "v1".to_string(),
            channel_id: Uuid::new_v4(),
            title: "Title".to_string(),
            duration: "PT1M".to_string(),
            published_at: now(),
            status: VideoStatus::Ended,
            kind: VideoKind::Short,
            thumbnail,
            deleted_at: None,
        }
    }

    fn thumb(deleted: bool) -> SavedThumbnail {
        SavedThumbnail {
            id: Uuid::new_v4(),
            path: "v1/a.jpg".to_string(),
            width: 1280,
            height: 720,
            blur_data_url: String::new(),
            etag: None,
            deleted_at: deleted.then(now),
            updated_at: now(),
        }
    }

    #[test]
    fn delete_targets_carry_live_thumbnails_only() {
        let live = saved(Some(thumb(false)));
        let stale = saved(Some(thumb(true)));
        let bare = saved(None);
        let ids = vec![live.id, stale.id, bare.id];

        let targets = delete_targets(&ids, &[live.clone(), stale, bare]);

        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].thumbnail_id, live.thumbnail.map(|t| t.id));
        assert_eq!(targets[1].thumbnail_id, None);
        assert_eq!(targets[2].thumbnail_id, None);
    }

    #[tokio::test]
    async fn nothing_tracked_means_no_catalog_calls() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<video::Model>::new()])
            .into_connection();
        let catalog = Arc::new(StubCatalog::default());
        let pipeline = ThumbnailPipeline::new(
            Arc::new(MockTransport::new()),
            Arc::new(MemoryBlobStore::default()),
            SyncOptions::default().pipeline_options(),
        );
        let engine = SyncEngine::builder()
            .database(db)
            .catalog(catalog.clone())
            .pipeline(pipeline)
            .build()
            .unwrap();

        let report = engine.run_check(CheckMode::All, now()).await.unwrap();

        assert_eq!(report, SyncReport::default());
        assert!(catalog.batch_calls().is_empty());
    }
}
