use vidsync::sync::SyncProgress;

use super::ProgressSink;

/// Emits each event as a tracing record. Used for cron and CI output.
pub struct LoggingReporter;

impl ProgressSink for LoggingReporter {
    fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::ChannelsLoaded { count } => {
                tracing::info!(count, "Loaded tracked channels");
            }

            SyncProgress::FetchingPlaylist {
                channel,
                playlist_id,
            } => {
                tracing::info!(channel = %channel, playlist_id = %playlist_id, "Fetching uploads");
            }

            SyncProgress::FetchedPage {
                channel,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(channel = %channel, page, count, total_so_far, "Fetched page");
            }

            SyncProgress::FetchedBatch { count, remaining } => {
                tracing::debug!(count, remaining, "Fetched detail batch");
            }

            SyncProgress::BatchFailed { ids, error } => {
                tracing::warn!(ids, error = %error, "Detail batch failed");
            }

            SyncProgress::Reconciled {
                inserts,
                updates,
                unavailable,
                dropped,
            } => {
                tracing::info!(inserts, updates, unavailable, dropped, "Reconciled");
            }

            SyncProgress::ThumbnailsStarted { count, concurrency } => {
                tracing::info!(count, concurrency, "Refreshing thumbnails");
            }

            SyncProgress::ThumbnailDone { external_id } => {
                tracing::debug!(video = %external_id, "Thumbnail stored");
            }

            SyncProgress::ThumbnailFailed { external_id, error } => {
                tracing::warn!(video = %external_id, error = %error, "Thumbnail failed");
            }

            SyncProgress::Persisted {
                inserted,
                updated,
                failed,
            } => {
                if failed > 0 {
                    tracing::warn!(inserted, updated, failed, "Saved with failures");
                } else {
                    tracing::info!(inserted, updated, "Saved to database");
                }
            }

            SyncProgress::SoftDeleted { count } => {
                tracing::info!(count, "Soft-deleted unavailable videos");
            }

            SyncProgress::SoftDeleteSkipped {
                candidates,
                failed_batches,
            } => {
                tracing::warn!(
                    candidates,
                    failed_batches,
                    "Skipped soft delete, remote view incomplete"
                );
            }

            SyncProgress::RetryBackoff {
                operation,
                retry_after_ms,
                attempt,
            } => {
                tracing::warn!(
                    operation = %operation,
                    retry_after_ms,
                    attempt,
                    "Transient failure, backing off"
                );
            }

            SyncProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}
