//! Vidsync - video catalog ingestion and reconciliation.
//!
//! This library mirrors the uploads of tracked YouTube channels into a local
//! relational store: it fetches the remote catalog, diffs it against saved
//! rows, refreshes thumbnails into blob storage and writes the changes.
//!
//! # Features
//!
//! - `youtube` - The YouTube Data API client ([`youtube::YouTubeClient`]).
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//! - `sqlite` / `postgres` - Database drivers.
//!
//! # Example
//!
//! ```ignore
//! use vidsync::{connect_and_migrate, sync::{CheckMode, SyncEngine}};
//!
//! let db = connect_and_migrate("sqlite://vidsync.db?mode=rwc").await?;
//! let engine = SyncEngine::builder()
//!     .database(db)
//!     .catalog(catalog)
//!     .pipeline(pipeline)
//!     .build()?;
//!
//! let report = engine.run_update(chrono::Utc::now()).await?;
//! let report = engine.run_check(CheckMode::All, chrono::Utc::now()).await?;
//! ```

pub mod catalog;
pub mod db;
pub mod entity;
pub mod http;
pub mod persistence;
pub mod reconcile;
pub mod retry;
pub mod sync;
pub mod thumbnail;
pub mod trigger;

#[cfg(feature = "youtube")]
pub mod youtube;

#[cfg(feature = "migrate")]
pub mod migration;

pub use catalog::{
    ApiRateLimiter, CatalogError, RemoteCatalog, RemoteChannel, RemoteRecord, rate_limits,
};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use persistence::PersistenceError;
pub use reconcile::reconcile;
pub use sync::{CheckMode, SyncEngine, SyncError, SyncOptions, SyncReport};
pub use thumbnail::{BlobStore, HttpBlobStore, ThumbnailPipeline};
pub use trigger::{TriggerGuard, TriggerMode, TriggerRequest, TriggerResponse, handle_trigger};
