//! YouTube Data API v3 implementation of [`RemoteCatalog`](crate::catalog::RemoteCatalog).
//!
//! - [`client`] - API-key client over the HTTP transport
//! - [`types`] - wire types for `channels`, `playlistItems` and `videos`
//! - [`convert`] - wire types to catalog records
//! - [`error`] - API errors and their catalog mapping

mod client;
mod convert;
mod error;
mod types;

pub use client::{YOUTUBE_API_BASE, YouTubeClient};
pub use convert::{ZERO_DURATION, parse_timestamp};
pub use error::{YouTubeError, short_error_message};
