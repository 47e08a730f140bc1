//! Vidsync CLI - runs catalog sync jobs and manages tracked channels.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::channel::ChannelAction;
use crate::commands::sync::{SyncAction, TriggerKind};

#[derive(Parser)]
#[command(name = "vidsync")]
#[command(version)]
#[command(about = "Mirror YouTube channel uploads into a local catalog")]
#[command(
    long_about = "Vidsync keeps a relational catalog of videos in step with the YouTube \
channels it tracks. Update runs pick up new and changed uploads; check runs re-verify \
stored videos and soft-delete the ones that disappeared. Thumbnails are mirrored into \
blob storage with a tiny blur placeholder."
)]
#[command(after_long_help = r#"EXAMPLES
    Track a channel:
        $ vidsync channel add UC_x5XG1OV2P6uZZ5FSM9Ttw

    Pick up new uploads:
        $ vidsync sync update

    Re-check every stored video without writing anything:
        $ vidsync sync check --all --dry-run

    Run the way the scheduler does (prints a JSON summary):
        $ vidsync trigger recent --secret "$VIDSYNC_TRIGGER_TOKEN"

    Generate shell completions:
        $ vidsync completions bash > ~/.local/share/bash-completion/completions/vidsync

CONFIGURATION
    Vidsync reads configuration from:
      1. ~/.config/vidsync/config.toml (or $XDG_CONFIG_HOME/vidsync/config.toml)
      2. ./vidsync.toml
      3. Environment variables (VIDSYNC_ prefix, `__` between section and key)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    VIDSYNC_DATABASE__URL        Database connection string (default: ~/.local/state/vidsync/vidsync.db)
    VIDSYNC_YOUTUBE__API_KEY     YouTube Data API key
    VIDSYNC_STORAGE__URL         Blob storage REST base URL
    VIDSYNC_STORAGE__TOKEN       Blob storage service token
    VIDSYNC_TRIGGER__SECRET      Secret a trigger must present
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    #[cfg(feature = "migrate")]
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage tracked channels
    Channel {
        #[command(subcommand)]
        action: ChannelAction,
    },
    /// Run a sync
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
    /// Run one sync the way the scheduler does and print its JSON response
    Trigger {
        /// Which run to start
        #[arg(value_enum, default_value_t = TriggerKind::Recent)]
        kind: TriggerKind,

        /// Shared secret to present
        #[arg(short, long, env = "VIDSYNC_TRIGGER_TOKEN", hide_env_values = true)]
        secret: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(feature = "migrate")]
#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// List migrations and whether each is applied
    Status,
    /// Drop all tables and reapply every migration
    Fresh {
        /// Confirm that existing data may be destroyed
        #[arg(long)]
        yes: bool,
    },
}

async fn open_database(
    database_url: &str,
) -> Result<vidsync::db::DatabaseConnection, Box<dyn std::error::Error>> {
    #[cfg(feature = "migrate")]
    let db = vidsync::connect_and_migrate(database_url).await?;
    #[cfg(not(feature = "migrate"))]
    let db = vidsync::connect(database_url).await?;
    Ok(db)
}

/// Create the parent directory of a file-backed SQLite database.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging when not attached to a TTY (cron, CI, pipes)
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("vidsync=info,vidsync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    // Handle commands that don't require database access first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set database.url")?;
    ensure_sqlite_dir(&database_url)?;

    let cancel = Arc::new(AtomicBool::new(false));

    match cli.command {
        #[cfg(feature = "migrate")]
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Channel { action } => {
            let db = open_database(&database_url).await?;
            commands::channel::handle_channel(action, &config, &db).await?;
        }
        Commands::Sync { action } => {
            shutdown::setup_shutdown_handler(Arc::clone(&cancel));
            let db = open_database(&database_url).await?;
            commands::sync::handle_sync(action, &config, db, cancel).await?;
        }
        Commands::Trigger { kind, secret } => {
            shutdown::setup_shutdown_handler(Arc::clone(&cancel));
            let db = open_database(&database_url).await?;
            commands::sync::handle_trigger_command(kind, secret, &config, db, cancel).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_all_parses() {
        let cli = Cli::try_parse_from(["vidsync", "sync", "check", "--all", "-n"]).unwrap();
        match cli.command {
            Commands::Sync {
                action: SyncAction::Check { all, run },
            } => {
                assert!(all);
                assert!(run.dry_run);
            }
            _ => panic!("expected sync check"),
        }
    }

    #[test]
    fn trigger_defaults_to_recent() {
        let cli = Cli::try_parse_from(["vidsync", "trigger"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Trigger {
                kind: TriggerKind::Recent,
                ..
            }
        ));
    }

    #[test]
    fn non_sqlite_urls_need_no_directory() {
        ensure_sqlite_dir("postgres://localhost/vidsync").unwrap();
    }
}
