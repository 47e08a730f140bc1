use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use vidsync::sync::SyncProgress;

use super::ProgressSink;

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// Playlist bars by channel id.
    fetch_bars: HashMap<String, ProgressBar>,
    /// Detail batches, shared by all channels of a run.
    detail_bar: Option<ProgressBar>,
    details_done: usize,
    thumb_bar: Option<ProgressBar>,
    save_bar: Option<ProgressBar>,
    saved: usize,
    failed: usize,
}

/// Interactive progress reporter using indicatif.
///
/// One spinner per channel playlist, then shared bars for detail batches,
/// thumbnails and saving.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn counter_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {pos:>4} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl ProgressSink for InteractiveReporter {
    fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::FetchingPlaylist { channel, .. } => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                pb.set_prefix(format!("{:24}", channel));
                pb.set_message("Fetching uploads...");
                if let Some(old) = state.fetch_bars.insert(channel, pb) {
                    old.finish_and_clear();
                }
            }

            SyncProgress::FetchedPage {
                channel,
                page,
                total_so_far,
                ..
            } => {
                if let Some(pb) = state.fetch_bars.get(&channel) {
                    pb.set_message(format!("Page {} ({} videos)", page, total_so_far));
                }
            }

            SyncProgress::FetchedBatch { count, remaining } => {
                state.details_done += count;
                let total = (state.details_done + remaining) as u64;
                let done = state.details_done as u64;
                let pb = state.detail_bar.get_or_insert_with(|| {
                    let bar = self.multi.add(ProgressBar::new(total));
                    bar.set_style(Self::bar_style());
                    bar.set_prefix(format!("{:24}", "Details"));
                    bar
                });
                pb.set_length(total.max(done));
                pb.set_position(done);
                if remaining == 0 {
                    pb.set_message("✓ fetched");
                }
            }

            SyncProgress::BatchFailed { ids, error } => {
                drop(state);
                self.multi
                    .println(format!("✗ batch of {} ids failed: {}", ids, error))
                    .ok();
            }

            SyncProgress::ThumbnailsStarted { count, .. } => {
                let pb = self.multi.add(ProgressBar::new(count as u64));
                pb.set_style(Self::bar_style());
                pb.set_prefix(format!("{:24}", "Thumbnails"));
                if let Some(old) = state.thumb_bar.replace(pb) {
                    old.finish();
                }
            }

            SyncProgress::ThumbnailDone { external_id } => {
                if let Some(ref pb) = state.thumb_bar {
                    pb.inc(1);
                    pb.set_message(external_id);
                }
            }

            SyncProgress::ThumbnailFailed { external_id, error } => {
                if let Some(ref pb) = state.thumb_bar {
                    pb.inc(1);
                    pb.set_message(format!("✗ {}: {}", external_id, error));
                }
            }

            SyncProgress::Persisted {
                inserted,
                updated,
                failed,
            } => {
                state.saved += inserted + updated;
                state.failed += failed;
                let (saved, failed) = (state.saved, state.failed);
                let pb = state.save_bar.get_or_insert_with(|| {
                    let bar = self.multi.add(ProgressBar::new_spinner());
                    bar.set_style(Self::counter_style());
                    bar.set_prefix(format!("{:24}", "Saving"));
                    bar
                });
                pb.set_position(saved as u64);
                if failed > 0 {
                    pb.set_message(format!("saved, {} failed", failed));
                } else {
                    pb.set_message("saved");
                }
            }

            SyncProgress::SoftDeleted { count } => {
                drop(state);
                self.multi
                    .println(format!("✓ {} unavailable videos soft-deleted", count))
                    .ok();
            }

            SyncProgress::SoftDeleteSkipped { candidates, .. } => {
                drop(state);
                self.multi
                    .println(format!(
                        "⚠ {} videos look unavailable, but some batches failed; nothing deleted",
                        candidates
                    ))
                    .ok();
            }

            SyncProgress::RetryBackoff {
                operation,
                retry_after_ms,
                attempt,
            } => {
                if let Some(ref pb) = state.save_bar {
                    pb.set_message(format!(
                        "⏳ {} retry {} in {:.1}s",
                        operation,
                        attempt,
                        retry_after_ms as f64 / 1000.0
                    ));
                }
            }

            SyncProgress::Warning { message } => {
                drop(state);
                self.multi.println(format!("⚠ {}", message)).ok();
            }

            _ => {}
        }
    }

    fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for pb in state.fetch_bars.values() {
            if !pb.is_finished() {
                pb.finish_with_message("✓ done");
            }
        }
        for pb in [&state.detail_bar, &state.thumb_bar, &state.save_bar]
            .into_iter()
            .flatten()
        {
            if !pb.is_finished() {
                pb.finish();
            }
        }
    }
}
