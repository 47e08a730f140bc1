//! Read access to the remote video catalog.
//!
//! [`RemoteCatalog`] is the seam between the sync engine and the hosting
//! platform. The YouTube Data API implementation lives in
//! [`crate::youtube`]; tests substitute an in-memory catalog.
//!
//! ```ignore
//! use vidsync::catalog::{PageScope, PlaylistCursor, VideoBatches};
//!
//! let ids = PlaylistCursor::new(catalog.clone(), uploads, PageScope::Recent)
//!     .collect_all()
//!     .await?;
//! let settled = VideoBatches::new(catalog, &ids, 50).collect_settled().await;
//! ```

mod errors;
mod pagination;
mod rate_limit;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{CatalogError, Result, short_error_message};
pub use pagination::{
    BatchFailure, BatchOutcome, PageScope, PlaylistCursor, SettledBatches, VideoBatches,
    fetch_channel_details, list_uploaded_video_ids,
};
pub use rate_limit::{ApiRateLimiter, rate_limits};
pub use types::{
    LiveStreamingDetails, MAX_IDS_PER_CALL, PlaylistPage, RemoteCatalog, RemoteChannel,
    RemoteRecord, ThumbnailCandidate, ThumbnailSet,
};
