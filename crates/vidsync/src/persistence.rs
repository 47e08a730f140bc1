//! Database reads and writes used by a sync run.
//!
//! Every write path reports its own failures instead of aborting its
//! siblings: updates and inserts are written concurrently and independently,
//! and the same holds for video and thumbnail soft deletes.

mod channels;
mod errors;
mod links;
mod retry;
mod saved;
mod soft_delete;
mod thumbnails;
mod videos;

pub use channels::{
    find_channel, list_active_channels, track_channel, untrack_channel, update_channel_metadata,
};
pub use errors::{PersistenceError, Result};
pub use links::{RepairedLink, find_unlinked_videos, link_external_id, repair_links};
pub use retry::{DEFAULT_WRITE_BACKOFF_MS, DEFAULT_WRITE_RETRIES};
pub use saved::{
    ALL_TRACKED_PAGE_SIZE, LOOKUP_CHUNK_SIZE, RECENT_TRACKED_LIMIT, TrackedScope,
    load_saved_videos, load_tracked_external_ids, to_saved_thumbnail, to_saved_video,
};
pub use soft_delete::{
    SoftDeleteOutcome, SoftDeleteTable, SoftDeleteTarget, soft_delete,
    soft_delete_orphaned_thumbnails, soft_delete_videos,
};
pub use thumbnails::{PersistedThumbnail, ThumbnailRow, ThumbnailUpsertOutcome, upsert_thumbnails};
pub use videos::{
    ChannelRef, InsertedVideo, UpsertOutcome, VideoWrite, WriteFailure, WritePath, update_video,
    upsert_videos,
};

/// SQL text of every statement a mock connection saw, joined by newlines.
#[cfg(test)]
pub(crate) fn logged_sql(db: sea_orm::DatabaseConnection) -> String {
    db.into_transaction_log()
        .iter()
        .flat_map(|txn| txn.statements().iter().map(|s| s.sql.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}
