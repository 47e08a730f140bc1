//! Sync runs: pulling the remote catalog into the local store.
//!
//! # Module Structure
//!
//! - [`types`] - Core types: `SyncReport`, `SyncOptions`, `SyncError`, constants
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`engine`] - The sync engine: `run_update()` and `run_check()`
//! - [`cache`] - Per-run memoization of channel lookups
//!
//! # Example
//!
//! ```ignore
//! use vidsync::sync::{CheckMode, SyncEngine, SyncOptions};
//!
//! let engine = SyncEngine::builder()
//!     .database(db)
//!     .catalog(catalog)
//!     .pipeline(pipeline)
//!     .options(SyncOptions::default())
//!     .build()?;
//! let report = engine.run_check(CheckMode::Recent, chrono::Utc::now()).await?;
//! println!("{} updated, {} deleted", report.updated, report.deleted);
//! ```

mod cache;
pub mod engine;
mod progress;
mod types;

pub use cache::RunCache;

// Re-export types
pub use types::{CheckMode, Result as SyncResult, SyncError, SyncOptions, SyncReport};

// Re-export constants
pub use types::{DEFAULT_BATCH_SIZE, DEFAULT_CHANNEL_SPACING, DEFAULT_THUMBNAIL_SPACING};

// Re-export progress types
pub use progress::{ProgressCallback, SyncProgress, emit};

pub use engine::{SyncEngine, SyncEngineBuilder};
