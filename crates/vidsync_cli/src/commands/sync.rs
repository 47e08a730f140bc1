//! Sync commands: `update`, `check` and the scheduler-facing `trigger`.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::Utc;
use clap::{Args, Subcommand, ValueEnum};
use console::{Term, style};
use tabled::{Table, Tabled, settings::Style};
use vidsync::catalog::RemoteCatalog;
use vidsync::db::DatabaseConnection;
use vidsync::thumbnail::ThumbnailPipeline;
use vidsync::{
    CheckMode, SyncEngine, SyncOptions, SyncReport, TriggerGuard, TriggerMode, TriggerRequest,
    handle_trigger,
};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Options shared by every run kind.
#[derive(Debug, Clone, Default, Args)]
pub struct RunOptions {
    /// Dry run - compute and report changes without writing or uploading
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Maximum concurrent thumbnail downloads (default from config or 12)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Video ids per detail request, at most 50 (default from config or 50)
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,
}

#[derive(Subcommand)]
pub enum SyncAction {
    /// Pick up new and changed uploads on every tracked channel
    Update {
        /// Walk every page of each uploads playlist, not just the newest
        #[arg(long)]
        full_history: bool,

        #[command(flatten)]
        run: RunOptions,
    },
    /// Re-check tracked videos and soft-delete the ones that disappeared
    Check {
        /// Sweep every tracked video instead of the most recent ones
        #[arg(short = 'a', long)]
        all: bool,

        #[command(flatten)]
        run: RunOptions,
    },
}

/// Run kinds a scheduler can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerKind {
    Update,
    Recent,
    All,
}

impl From<TriggerKind> for TriggerMode {
    fn from(kind: TriggerKind) -> Self {
        match kind {
            TriggerKind::Update => TriggerMode::Update,
            TriggerKind::Recent => TriggerMode::Check(CheckMode::Recent),
            TriggerKind::All => TriggerMode::Check(CheckMode::All),
        }
    }
}

/// Display row for the run summary.
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Result")]
    label: &'static str,
    #[tabled(rename = "Count")]
    count: usize,
}

fn summary_rows(report: &SyncReport) -> Vec<SummaryRow> {
    let row = |label, count| SummaryRow { label, count };
    vec![
        row("Processed", report.processed),
        row("Inserted", report.inserted),
        row("Updated", report.updated),
        row("Deleted", report.deleted),
        row("Thumbnails", report.thumbnails),
        row("Repaired links", report.repaired),
        row("Dropped", report.dropped),
        row("Failed", report.failed),
    ]
}

pub async fn handle_sync(
    action: SyncAction,
    config: &Config,
    db: DatabaseConnection,
    cancel: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (run, full_history, mode) = match action {
        SyncAction::Update { full_history, run } => (run, full_history, TriggerMode::Update),
        SyncAction::Check { all, run } => {
            let mode = if all { CheckMode::All } else { CheckMode::Recent };
            (run, false, TriggerMode::Check(mode))
        }
    };

    let mut options = sync_options(config, &run, cancel);
    options.full_history |= full_history;
    let dry_run = options.dry_run;

    let reporter = ProgressReporter::new();
    let engine = SyncEngine::builder()
        .database(db)
        .catalog(build_catalog(config)?)
        .pipeline(build_pipeline(config, &options)?)
        .options(options)
        .progress(reporter.as_callback())
        .build()?;

    let now = Utc::now();
    let result = match mode {
        TriggerMode::Update => engine.run_update(now).await,
        TriggerMode::Check(mode) => engine.run_check(mode, now).await,
    };
    reporter.finish();
    let report = result?;

    print_summary(&report, dry_run);
    if report.failed > 0 {
        return Err(format!("{} item(s) failed", report.failed).into());
    }
    Ok(())
}

/// Run once the way a scheduler would and print the JSON response.
pub async fn handle_trigger_command(
    kind: TriggerKind,
    secret: Option<String>,
    config: &Config,
    db: DatabaseConnection,
    cancel: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = sync_options(config, &RunOptions::default(), cancel);
    let engine = SyncEngine::builder()
        .database(db)
        .catalog(build_catalog(config)?)
        .pipeline(build_pipeline(config, &options)?)
        .options(options)
        .build()?;

    let request = TriggerRequest {
        mode: kind.into(),
        secret,
    };
    let response = handle_trigger(
        &engine,
        &TriggerGuard::new(),
        request,
        config.trigger_secret(),
        Utc::now(),
    )
    .await;

    println!("{}", serde_json::to_string_pretty(&response.body)?);
    if response.is_success() {
        Ok(())
    } else {
        Err(format!("trigger failed with status {}", response.status).into())
    }
}

/// Config values with CLI overrides applied.
fn sync_options(config: &Config, run: &RunOptions, cancel: Arc<AtomicBool>) -> SyncOptions {
    let mut options = config.sync.to_options();
    options.dry_run = run.dry_run;
    if let Some(concurrency) = run.concurrency {
        options.thumbnail_concurrency = concurrency.max(1);
    }
    if let Some(batch_size) = run.batch_size {
        options.batch_size = batch_size.clamp(1, vidsync::catalog::MAX_IDS_PER_CALL);
    }
    options.cancel = cancel;
    options
}

#[cfg(feature = "youtube")]
pub(crate) fn build_catalog(
    config: &Config,
) -> Result<Arc<dyn RemoteCatalog>, Box<dyn std::error::Error>> {
    use vidsync::ApiRateLimiter;
    use vidsync::http::reqwest_transport::{DEFAULT_TIMEOUT, ReqwestTransport};
    use vidsync::youtube::YouTubeClient;

    let api_key = config.youtube_api_key().ok_or(
        "YouTube API key not configured. Set youtube.api_key in vidsync.toml or VIDSYNC_YOUTUBE__API_KEY",
    )?;
    let limiter = ApiRateLimiter::new(config.youtube.requests_per_second);

    let client = match config.youtube.base_url.as_deref() {
        Some(base_url) => YouTubeClient::new_with_transport(
            base_url,
            api_key,
            Some(limiter),
            Arc::new(ReqwestTransport::with_timeout(DEFAULT_TIMEOUT)?),
        ),
        None => YouTubeClient::new(api_key, Some(limiter))?,
    };
    Ok(Arc::new(client))
}

#[cfg(not(feature = "youtube"))]
pub(crate) fn build_catalog(
    _config: &Config,
) -> Result<Arc<dyn RemoteCatalog>, Box<dyn std::error::Error>> {
    Err("vidsync was built without the `youtube` feature".into())
}

/// Thumbnail pipeline over HTTP, uploading to the configured storage.
///
/// Storage settings may be omitted for dry runs, which never upload.
#[cfg(feature = "youtube")]
fn build_pipeline(
    config: &Config,
    options: &SyncOptions,
) -> Result<ThumbnailPipeline, Box<dyn std::error::Error>> {
    use vidsync::http::reqwest_transport::{DEFAULT_TIMEOUT, ReqwestTransport};
    use vidsync::thumbnail::{BlobStore, HttpBlobStore, UnconfiguredBlobStore};

    let transport = Arc::new(ReqwestTransport::with_timeout(DEFAULT_TIMEOUT)?);
    let blob: Arc<dyn BlobStore> = match (&config.storage.url, &config.storage.token) {
        (Some(url), Some(token)) => Arc::new(HttpBlobStore::new(
            transport.clone(),
            url.as_str(),
            config.storage.bucket.as_str(),
            token.as_str(),
        )),
        _ if options.dry_run => Arc::new(UnconfiguredBlobStore),
        _ => {
            return Err(
                "Blob storage not configured. Set storage.url and storage.token (or use --dry-run)"
                    .into(),
            );
        }
    };
    Ok(ThumbnailPipeline::new(
        transport,
        blob,
        options.pipeline_options(),
    ))
}

#[cfg(not(feature = "youtube"))]
fn build_pipeline(
    _config: &Config,
    _options: &SyncOptions,
) -> Result<ThumbnailPipeline, Box<dyn std::error::Error>> {
    Err("vidsync was built without the `youtube` feature".into())
}

fn print_summary(report: &SyncReport, dry_run: bool) {
    if !Term::stdout().is_term() {
        tracing::info!(
            processed = report.processed,
            inserted = report.inserted,
            updated = report.updated,
            deleted = report.deleted,
            thumbnails = report.thumbnails,
            failed = report.failed,
            partial = report.partial,
            aborted = report.aborted,
            dry_run,
            "Sync summary"
        );
        for error in &report.errors {
            tracing::warn!(error = %error, "Sync error");
        }
        return;
    }

    println!();
    if dry_run {
        println!("{}", style("Dry run - nothing was written").yellow().bold());
    }
    let mut table = Table::new(summary_rows(report));
    table.with(Style::rounded());
    println!("{}", table);

    if report.partial {
        println!(
            "{} Some batches failed; unavailable videos were not deleted this run.",
            style("⚠").yellow().bold()
        );
    }
    if report.aborted {
        println!("{} Run was cancelled before finishing.", style("⚠").yellow().bold());
    }
    for error in report.errors.iter().take(20) {
        println!("  {} {}", style("✗").red(), error);
    }
    if report.errors.len() > 20 {
        println!("  ... and {} more", report.errors.len() - 20);
    }
    if report.is_success() && !report.has_changes() {
        println!("{} Everything up to date.", style("✓").green().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_kinds_map_to_modes() {
        assert_eq!(TriggerMode::from(TriggerKind::Update), TriggerMode::Update);
        assert_eq!(
            TriggerMode::from(TriggerKind::Recent),
            TriggerMode::Check(CheckMode::Recent)
        );
        assert_eq!(
            TriggerMode::from(TriggerKind::All),
            TriggerMode::Check(CheckMode::All)
        );
    }

    #[test]
    fn cli_flags_override_config() {
        let config = Config::default();
        let run = RunOptions {
            dry_run: true,
            concurrency: Some(0),
            batch_size: Some(500),
        };
        let cancel = Arc::new(AtomicBool::new(false));

        let options = sync_options(&config, &run, cancel.clone());

        assert!(options.dry_run);
        assert_eq!(options.thumbnail_concurrency, 1);
        assert_eq!(options.batch_size, 50);
        assert!(Arc::ptr_eq(&options.cancel, &cancel));
    }

    #[test]
    fn summary_lists_every_count() {
        let report = SyncReport {
            inserted: 3,
            failed: 1,
            ..SyncReport::default()
        };
        let rows = summary_rows(&report);

        assert_eq!(rows.len(), 8);
        assert_eq!(rows[1].count, 3);
        assert_eq!(rows[7].label, "Failed");
        assert_eq!(rows[7].count, 1);
    }

    #[cfg(feature = "youtube")]
    #[test]
    fn catalog_requires_api_key() {
        let err = build_catalog(&Config::default()).err().expect("missing key");
        assert!(err.to_string().contains("API key"));
    }

    #[cfg(feature = "youtube")]
    #[test]
    fn pipeline_requires_storage_unless_dry_run() {
        let config = Config::default();
        let mut options = SyncOptions::default();
        assert!(build_pipeline(&config, &options).is_err());

        options.dry_run = true;
        assert!(build_pipeline(&config, &options).is_ok());
    }
}
