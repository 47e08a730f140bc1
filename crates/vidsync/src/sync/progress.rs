//! Progress events emitted during sync runs.
//!
//! The engine never renders anything itself; the CLI turns these events into
//! progress bars or log lines.

/// Progress events emitted during `update` and `check` runs.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Tracked channels loaded for an update run.
    ChannelsLoaded {
        count: usize,
    },

    /// Starting to walk a channel's uploads playlist.
    FetchingPlaylist {
        channel: String,
        playlist_id: String,
    },

    /// Read one playlist page.
    FetchedPage {
        channel: String,
        /// Page number (1-indexed).
        page: u32,
        count: usize,
        total_so_far: usize,
    },

    /// A detail batch came back.
    FetchedBatch {
        count: usize,
        /// Ids still waiting for a batch.
        remaining: usize,
    },

    /// A detail batch failed; its ids are left untouched this run.
    BatchFailed {
        ids: usize,
        error: String,
    },

    /// Diff computed.
    Reconciled {
        inserts: usize,
        updates: usize,
        unavailable: usize,
        dropped: usize,
    },

    ThumbnailsStarted {
        count: usize,
        concurrency: usize,
    },

    ThumbnailDone {
        external_id: String,
    },

    ThumbnailFailed {
        external_id: String,
        error: String,
    },

    /// Video rows written.
    Persisted {
        inserted: usize,
        updated: usize,
        failed: usize,
    },

    SoftDeleted {
        count: usize,
    },

    /// Soft deletion was withheld because the remote set was incomplete.
    SoftDeleteSkipped {
        candidates: usize,
        failed_batches: usize,
    },

    /// A transient error is being retried.
    RetryBackoff {
        operation: String,
        retry_after_ms: u64,
        attempt: u32,
    },

    /// Non-fatal problem worth surfacing.
    Warning {
        message: String,
    },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_with_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(Some(&callback), SyncProgress::ChannelsLoaded { count: 3 });
        emit(
            Some(&callback),
            SyncProgress::SoftDeleteSkipped {
                candidates: 4,
                failed_batches: 1,
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback() {
        emit(None, SyncProgress::SoftDeleted { count: 1 });
    }

    #[test]
    fn test_sync_progress_debug() {
        let event = SyncProgress::ThumbnailFailed {
            external_id: "dQw4w9WgXcQ".to_string(),
            error: "thumbnail fetch failed with HTTP 404".to_string(),
        };

        let debug_str = format!("{event:?}");
        assert!(debug_str.contains("ThumbnailFailed"));
        assert!(debug_str.contains("dQw4w9WgXcQ"));
    }
}
