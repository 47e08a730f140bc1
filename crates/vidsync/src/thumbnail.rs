//! Thumbnail side pipeline.
//!
//! For each video the best remote rendition is fetched with a conditional
//! GET, uploaded to blob storage under a fresh path, and described by a
//! [`ThumbnailRow`](crate::persistence::ThumbnailRow) carrying its size, ETag
//! and a blur placeholder.

mod blob;
mod blur;
mod conditional;
mod errors;
mod pipeline;

pub use blob::{
    BlobError, BlobStore, HttpBlobStore, THUMBNAIL_CACHE_CONTROL, UnconfiguredBlobStore,
};
pub use blur::{BLUR_WIDTH, blur_data_url};
pub use conditional::{ConditionalFetch, DEFAULT_CONTENT_TYPE, fetch_conditional};
pub use errors::ThumbnailError;
pub use pipeline::{
    DEFAULT_THUMBNAIL_CONCURRENCY, PipelineOptions, REFRESH_GRACE, ThumbnailBatch,
    ThumbnailFailure, ThumbnailJob, ThumbnailPipeline, extension_for,
};

#[cfg(test)]
pub(crate) use blob::MemoryBlobStore;
