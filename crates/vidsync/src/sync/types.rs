//! Sync run configuration, reports and errors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatalogError, MAX_IDS_PER_CALL, short_error_message};
use crate::persistence::{PersistenceError, TrackedScope};
use crate::thumbnail::{DEFAULT_THUMBNAIL_CONCURRENCY, PipelineOptions};

/// Which tracked videos a check run sweeps.
pub type CheckMode = TrackedScope;

/// Ids per detail request.
pub const DEFAULT_BATCH_SIZE: usize = MAX_IDS_PER_CALL;

/// Pause between channels in an update run.
pub const DEFAULT_CHANNEL_SPACING: Duration = Duration::from_millis(200);

/// Pause between thumbnail task starts.
pub const DEFAULT_THUMBNAIL_SPACING: Duration =
    Duration::from_millis(crate::catalog::rate_limits::THUMBNAIL_SPACING_MS);

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Compute and report changes without writing rows or uploading blobs.
    pub dry_run: bool,
    /// Walk every playlist page in update runs instead of the newest page.
    pub full_history: bool,
    pub batch_size: usize,
    pub thumbnail_concurrency: usize,
    pub thumbnail_spacing: Duration,
    pub channel_spacing: Duration,
    /// Set to stop the run at the next checkpoint.
    pub cancel: Arc<AtomicBool>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            full_history: false,
            batch_size: DEFAULT_BATCH_SIZE,
            thumbnail_concurrency: DEFAULT_THUMBNAIL_CONCURRENCY,
            thumbnail_spacing: DEFAULT_THUMBNAIL_SPACING,
            channel_spacing: DEFAULT_CHANNEL_SPACING,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SyncOptions {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            dry_run: self.dry_run,
            concurrency: self.thumbnail_concurrency,
            spacing: self.thumbnail_spacing,
        }
    }
}

/// Outcome of one sync run.
///
/// Per-item failures are counted and described in `errors`; they never turn
/// the run into an `Err`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[must_use = "SyncReport may contain errors that should be checked"]
pub struct SyncReport {
    /// Remote records examined.
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Thumbnail rows written.
    pub thumbnails: usize,
    pub failed: usize,
    /// New records skipped for lack of a publish time.
    pub dropped: usize,
    /// Unlinked video rows re-attached to their external id.
    pub repaired: usize,
    pub errors: Vec<String>,
    /// Some detail batches failed, so the remote view was incomplete.
    pub partial: bool,
    /// Cancellation stopped the run early.
    pub aborted: bool,
}

impl SyncReport {
    /// Whether stored content changed; consumers use this to invalidate caches.
    pub fn has_changes(&self) -> bool {
        self.inserted + self.updated + self.deleted + self.thumbnails + self.repaired > 0
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors.is_empty() && !self.partial && !self.aborted
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub(crate) fn record_failure(&mut self, count: usize, message: impl Into<String>) {
        self.failed += count;
        self.errors.push(message.into());
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: SyncReport) {
        self.processed += other.processed;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.thumbnails += other.thumbnails;
        self.failed += other.failed;
        self.dropped += other.dropped;
        self.repaired += other.repaired;
        self.errors.extend(other.errors);
        self.partial |= other.partial;
        self.aborted |= other.aborted;
    }
}

/// Run-level failures. Anything listed here aborts the run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(#[from] PersistenceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// First line of the error, for reports.
    pub fn short_message(&self) -> String {
        short_error_message(self)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
