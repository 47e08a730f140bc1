//! Configuration file support for vidsync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `VIDSYNC_`, sections split by `__`,
//!    e.g. `VIDSYNC_YOUTUBE__API_KEY`)
//! 3. Config file (./vidsync.toml, then ~/.config/vidsync/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/vidsync/vidsync.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "postgres://localhost/vidsync"
//!
//! [youtube]
//! api_key = "AIza..."  # or use VIDSYNC_YOUTUBE__API_KEY
//! requests_per_second = 10
//!
//! [storage]
//! url = "https://project.example.co/storage/v1"
//! bucket = "thumbnails"
//! token = "..."  # or use VIDSYNC_STORAGE__TOKEN
//!
//! [sync]
//! batch_size = 50
//! thumbnail_concurrency = 12
//! thumbnail_spacing_ms = 250
//! channel_spacing_ms = 200
//!
//! [trigger]
//! secret = "..."
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use vidsync::SyncOptions;
use vidsync::catalog::rate_limits;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub youtube: YouTubeConfig,
    /// Blob storage for thumbnails.
    pub storage: StorageConfig,
    /// Default sync options.
    pub sync: SyncConfig,
    pub trigger: TriggerConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// Data API key.
    pub api_key: Option<String>,
    /// Override for the API base URL.
    pub base_url: Option<String>,
    pub requests_per_second: u32,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            requests_per_second: rate_limits::YOUTUBE_DEFAULT_RPS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage REST base URL, e.g. `https://<project>/storage/v1`.
    pub url: Option<String>,
    pub bucket: String,
    /// Service token sent as a bearer credential.
    pub token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            bucket: "thumbnails".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub batch_size: usize,
    pub thumbnail_concurrency: usize,
    pub thumbnail_spacing_ms: u64,
    pub channel_spacing_ms: u64,
    /// Walk whole uploads playlists instead of the newest page.
    pub full_history: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let defaults = SyncOptions::default();
        Self {
            batch_size: defaults.batch_size,
            thumbnail_concurrency: defaults.thumbnail_concurrency,
            thumbnail_spacing_ms: defaults.thumbnail_spacing.as_millis() as u64,
            channel_spacing_ms: defaults.channel_spacing.as_millis() as u64,
            full_history: defaults.full_history,
        }
    }
}

impl SyncConfig {
    /// Engine options from config, before CLI overrides.
    pub fn to_options(&self) -> SyncOptions {
        SyncOptions {
            batch_size: self.batch_size.max(1),
            thumbnail_concurrency: self.thumbnail_concurrency.max(1),
            thumbnail_spacing: Duration::from_millis(self.thumbnail_spacing_ms),
            channel_spacing: Duration::from_millis(self.channel_spacing_ms),
            full_history: self.full_history,
            ..SyncOptions::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Shared secret the scheduler must present. Unset means no check.
    pub secret: Option<String>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/vidsync/config.toml)
    /// 3. Local config file (./vidsync.toml)
    /// 4. Environment variables with VIDSYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(proj_dirs) = ProjectDirs::from("", "", "vidsync") {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let local_config = PathBuf::from("vidsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./vidsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // VIDSYNC_YOUTUBE__API_KEY -> youtube.api_key
        builder = builder.add_source(env_source());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("vidsync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Get the API key, treating a blank value as unset.
    pub fn youtube_api_key(&self) -> Option<&str> {
        self.youtube
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn trigger_secret(&self) -> Option<&str> {
        self.trigger.secret.as_deref()
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/vidsync` or `~/.local/state/vidsync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "vidsync").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("VIDSYNC")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
