use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::{PageScope, PlaylistCursor, RemoteChannel, short_error_message};
use crate::entity::youtube_channel;
use crate::persistence::{
    ChannelRef, list_active_channels, load_saved_videos, repair_links, update_channel_metadata,
};

use super::super::cache::RunCache;
use super::super::progress::SyncProgress;
use super::super::types::{Result, SyncReport};
use super::SyncEngine;

impl SyncEngine {
    /// Pick up new and changed uploads on every tracked channel.
    ///
    /// Channels are handled one after another. A failing channel is recorded
    /// and the run moves on.
    ///
    /// # Errors
    ///
    /// Fails only when the channel list or channel details cannot be loaded.
    pub async fn run_update(&self, now: DateTime<Utc>) -> Result<SyncReport> {
        let channels = list_active_channels(&self.db).await?;
        self.emit(SyncProgress::ChannelsLoaded {
            count: channels.len(),
        });
        let mut report = SyncReport::default();
        if channels.is_empty() {
            tracing::info!("no tracked channels");
            return Ok(report);
        }

        let cache = RunCache::new();
        let ids: Vec<String> = channels
            .iter()
            .map(|c| c.youtube_channel_id.clone())
            .collect();
        cache.prefetch(self.catalog.as_ref(), &ids).await?;

        for (index, channel) in channels.iter().enumerate() {
            if self.cancelled(&mut report) {
                break;
            }
            if index > 0 && !self.options.channel_spacing.is_zero() {
                tokio::time::sleep(self.options.channel_spacing).await;
            }

            let remote = match cache
                .channel(self.catalog.as_ref(), &channel.youtube_channel_id)
                .await
            {
                Ok(remote) => remote,
                Err(e) => {
                    report.record_error(format!(
                        "channel {}: lookup failed: {}",
                        channel.youtube_channel_id,
                        short_error_message(&e)
                    ));
                    continue;
                }
            };
            let Some(remote) = remote.as_ref() else {
                let message = format!(
                    "channel {} not returned by the catalog",
                    channel.youtube_channel_id
                );
                tracing::warn!(
                    channel = %channel.youtube_channel_id,
                    "channel missing from catalog",
                );
                self.emit(SyncProgress::Warning {
                    message: message.clone(),
                });
                report.record_error(message);
                continue;
            };

            if !self.options.dry_run
                && let Err(e) = update_channel_metadata(&self.db, channel, remote).await
            {
                report.record_error(format!(
                    "channel {}: metadata update failed: {}",
                    channel.youtube_channel_id,
                    short_error_message(&e)
                ));
            }

            let channel_report = self.sync_channel(channel, remote, now).await;
            tracing::info!(
                channel = %channel.youtube_channel_id,
                inserted = channel_report.inserted,
                updated = channel_report.updated,
                failed = channel_report.failed,
                "channel synced"
            );
            report.merge(channel_report);
        }

        Ok(report)
    }

    async fn sync_channel(
        &self,
        channel: &youtube_channel::Model,
        remote: &RemoteChannel,
        now: DateTime<Utc>,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let channel_ref = ChannelRef::from(channel);
        let scope = if self.options.full_history {
            PageScope::All
        } else {
            PageScope::Recent
        };

        self.emit(SyncProgress::FetchingPlaylist {
            channel: channel_ref.external_id.clone(),
            playlist_id: remote.uploads_playlist_id.clone(),
        });

        let mut cursor = PlaylistCursor::new(
            Arc::clone(&self.catalog),
            remote.uploads_playlist_id.clone(),
            scope,
        );
        let mut ids: Vec<String> = Vec::new();
        loop {
            if self.cancelled(&mut report) {
                return report;
            }
            match cursor.next_page().await {
                Ok(Some(page)) => {
                    let count = page.len();
                    ids.extend(page);
                    self.emit(SyncProgress::FetchedPage {
                        channel: channel_ref.external_id.clone(),
                        page: cursor.pages_read(),
                        count,
                        total_so_far: ids.len(),
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    report.partial = true;
                    report.record_error(format!(
                        "channel {}: playlist page failed: {}",
                        channel_ref.external_id,
                        short_error_message(&e)
                    ));
                    break;
                }
            }
        }
        if ids.is_empty() {
            return report;
        }

        let settled = self.fetch_details(&ids, &mut report).await;
        if report.aborted || settled.records.is_empty() {
            return report;
        }

        if !self.options.dry_run {
            let repair = repair_links(
                &self.db,
                channel.id,
                &channel_ref.external_id,
                &settled.records,
            )
            .await;
            match repair {
                Ok(repaired) => report.repaired += repaired.len(),
                Err(e) => report.record_error(format!(
                    "channel {}: link repair failed: {}",
                    channel_ref.external_id,
                    short_error_message(&e)
                )),
            }
        }

        let saved = match load_saved_videos(&self.db, &ids).await {
            Ok(saved) => saved,
            Err(e) => {
                report.record_failure(
                    settled.records.len(),
                    format!(
                        "channel {}: loading saved videos failed: {}",
                        channel_ref.external_id,
                        short_error_message(&e)
                    ),
                );
                return report;
            }
        };

        // Disappearance is ignored here: a playlist window is a partial view.
        self.apply(&settled.records, &saved, Some(&channel_ref), now, &mut report)
            .await;
        report
    }
}
