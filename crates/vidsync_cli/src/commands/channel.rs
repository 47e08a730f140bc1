//! Channel management commands (add, list, remove).

use clap::Subcommand;
use console::style;
use tabled::{Table, Tabled, settings::Style};
use vidsync::YoutubeChannelModel;
use vidsync::db::DatabaseConnection;
#[cfg(feature = "youtube")]
use vidsync::catalog::fetch_channel_details;
#[cfg(feature = "youtube")]
use vidsync::persistence::update_channel_metadata;
use vidsync::persistence::{find_channel, list_active_channels, track_channel, untrack_channel};

use super::OutputFormat;
use crate::config::Config;

#[derive(Subcommand)]
pub enum ChannelAction {
    /// Start tracking a channel
    ///
    /// When a YouTube API key is configured, the channel's title and handle
    /// are fetched right away; otherwise the next update run fills them in.
    Add {
        /// Channel id (e.g., "UC_x5XG1OV2P6uZZ5FSM9Ttw")
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List tracked channels
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Stop tracking a channel (its videos are kept)
    Remove {
        /// Channel id
        id: String,
    },
}

/// Display struct for channel listing.
#[derive(Debug, Clone, serde::Serialize, Tabled)]
struct ChannelDisplay {
    #[tabled(rename = "Channel ID")]
    id: String,
    #[tabled(rename = "Title")]
    name: String,
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "Tracked Since")]
    created_at: String,
}

impl From<&YoutubeChannelModel> for ChannelDisplay {
    fn from(channel: &YoutubeChannelModel) -> Self {
        Self {
            id: channel.youtube_channel_id.clone(),
            name: channel.name.clone().unwrap_or_else(|| "-".to_string()),
            handle: channel.youtube_handle.clone().unwrap_or_else(|| "-".to_string()),
            created_at: channel.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

pub async fn handle_channel(
    action: ChannelAction,
    config: &Config,
    db: &DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ChannelAction::Add { ids } => add_channels(db, config, &ids).await,
        ChannelAction::List { output } => list_channels(db, output).await,
        ChannelAction::Remove { id } => remove_channel(db, &id).await,
    }
}

async fn add_channels(
    db: &DatabaseConnection,
    config: &Config,
    ids: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracked = Vec::with_capacity(ids.len());
    for id in ids {
        let channel = track_channel(db, id).await?;
        println!(
            "{} Tracking channel {}",
            style("✓").green().bold(),
            style(&channel.youtube_channel_id).cyan()
        );
        tracked.push(channel);
    }

    #[cfg(feature = "youtube")]
    if config.youtube_api_key().is_some() {
        refresh_metadata(db, config, &tracked).await?;
    }
    #[cfg(not(feature = "youtube"))]
    let _ = (config, tracked);

    Ok(())
}

/// Fill in title and handle for newly tracked channels.
#[cfg(feature = "youtube")]
async fn refresh_metadata(
    db: &DatabaseConnection,
    config: &Config,
    tracked: &[YoutubeChannelModel],
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = super::sync::build_catalog(config)?;
    let external_ids: Vec<String> = tracked
        .iter()
        .map(|c| c.youtube_channel_id.clone())
        .collect();
    let remote = fetch_channel_details(catalog.as_ref(), &external_ids).await?;

    for channel in tracked {
        match remote
            .iter()
            .find(|r| r.external_id == channel.youtube_channel_id)
        {
            Some(details) => {
                update_channel_metadata(db, channel, details).await?;
            }
            None => println!(
                "{} {} was not found on YouTube; update runs will report it",
                style("⚠").yellow().bold(),
                channel.youtube_channel_id
            ),
        }
    }
    Ok(())
}

async fn list_channels(
    db: &DatabaseConnection,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let channels = list_active_channels(db).await?;

    if channels.is_empty() {
        println!("No channels tracked.");
        println!();
        println!("Track one with:");
        println!("  vidsync channel add UC_x5XG1OV2P6uZZ5FSM9Ttw");
        return Ok(());
    }

    let displays: Vec<ChannelDisplay> = channels.iter().map(ChannelDisplay::from).collect();
    match output {
        OutputFormat::Table => {
            let mut table = Table::new(displays);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&displays)?);
        }
    }

    Ok(())
}

async fn remove_channel(
    db: &DatabaseConnection,
    id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !untrack_channel(db, id).await? {
        let known = find_channel(db, id).await?.is_some();
        let reason = if known { "is not tracked" } else { "not found" };
        return Err(format!("Channel '{}' {}", id, reason).into());
    }

    println!(
        "{} Stopped tracking {} (its videos are kept)",
        style("✓").green().bold(),
        style(id).cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn display_fills_missing_metadata() {
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap().fixed_offset();
        let channel = YoutubeChannelModel {
            id: Default::default(),
            youtube_channel_id: "UC1".to_string(),
            name: None,
            youtube_handle: Some("@one".to_string()),
            deleted_at: None,
            created_at: created,
            updated_at: created,
        };

        let display = ChannelDisplay::from(&channel);

        assert_eq!(display.id, "UC1");
        assert_eq!(display.name, "-");
        assert_eq!(display.handle, "@one");
        assert_eq!(display.created_at, "2024-03-09");
    }
}
