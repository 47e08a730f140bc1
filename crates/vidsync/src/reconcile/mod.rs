//! Diff remote records against saved videos.
//!
//! [`reconcile`] is pure: it takes the remote batch, the saved rows that share
//! its external ids and the current instant, and returns the write-set. It
//! performs no I/O and never looks at wall-clock time itself.
//!
//! Availability is a set difference over the *whole* batch. Callers must only
//! act on `unavailable_ids` when the remote batch is complete; a partially
//! fetched batch would mark live videos as gone.

mod status;
mod types;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::catalog::RemoteRecord;

pub use status::{SHORT_MAX_SECONDS, derive_kind, derive_status, parse_iso8601_duration};
pub use types::{ReconcileOutcome, SavedThumbnail, SavedVideo, VideoInsert, VideoUpdate};

/// Classify each remote record as new, changed or unchanged, and collect the
/// saved videos missing from the remote set.
pub fn reconcile(
    remote: &[RemoteRecord],
    saved: &[SavedVideo],
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let mut saved_by_external: HashMap<&str, &SavedVideo> = HashMap::with_capacity(saved.len());
    for video in saved {
        saved_by_external
            .entry(video.external_id.as_str())
            .or_insert(video);
    }

    let mut outcome = ReconcileOutcome::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(remote.len());

    for record in remote {
        if !seen.insert(record.external_id.as_str()) {
            continue;
        }

        match saved_by_external.get(record.external_id.as_str()) {
            Some(existing) => {
                if let Some(update) = diff(record, existing, now) {
                    outcome.updates.push(update);
                }
            }
            None => match new_video(record, now) {
                Some(insert) => outcome.inserts.push(insert),
                None => {
                    tracing::warn!(
                        external_id = %record.external_id,
                        "remote video has no publish time, not inserting"
                    );
                    outcome.dropped.push(record.external_id.clone());
                }
            },
        }
    }

    outcome.unavailable_ids = saved
        .iter()
        .filter(|video| !seen.contains(video.external_id.as_str()))
        .map(|video| video.id)
        .collect();

    outcome
}

fn new_video(record: &RemoteRecord, now: DateTime<Utc>) -> Option<VideoInsert> {
    let published_at = record.published_at()?;
    Some(VideoInsert {
        external_id: record.external_id.clone(),
        channel_external_id: record.channel_external_id.clone(),
        title: record.title.clone(),
        duration: record.duration.clone(),
        published_at,
        status: derive_status(record.live.as_ref(), now),
        kind: derive_kind(&record.duration),
        thumbnail_id: None,
    })
}

/// Field-by-field comparison. `None` when nothing changed and the row is live.
fn diff(record: &RemoteRecord, saved: &SavedVideo, now: DateTime<Utc>) -> Option<VideoUpdate> {
    let mut update = VideoUpdate::touch(saved.id, &saved.external_id, now);

    let status = derive_status(record.live.as_ref(), now);
    if status != saved.status {
        update.status = Some(status);
    }

    let kind = derive_kind(&record.duration);
    if kind != saved.kind {
        update.kind = Some(kind);
    }

    if record.duration != saved.duration {
        update.duration = Some(record.duration.clone());
    }

    // A missing remote publish time never counts as a change.
    if let Some(published_at) = record.published_at()
        && published_at != saved.published_at
    {
        update.published_at = Some(published_at);
    }

    if record.title != saved.title {
        update.title = Some(record.title.clone());
    }

    update.undelete = saved.is_deleted();

    if update.changed_fields().is_empty() {
        None
    } else {
        Some(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LiveStreamingDetails;
    use crate::catalog::testing::record;
    use crate::entity::video_kind::VideoKind;
    use crate::entity::video_status::VideoStatus;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap()
    }

    fn saved_from(rec: &RemoteRecord) -> SavedVideo {
        SavedVideo {
            id: Uuid::new_v4(),
            external_id: rec.external_id.clone(),
            channel_id: Uuid::new_v4(),
            title: rec.title.clone(),
            duration: rec.duration.clone(),
            published_at: rec.published_at().unwrap(),
            status: derive_status(rec.live.as_ref(), now()),
            kind: derive_kind(&rec.duration),
            thumbnail: None,
            deleted_at: None,
        }
    }

    /// Apply an outcome to the saved set the way persistence would.
    fn apply(saved: &mut Vec<SavedVideo>, outcome: &ReconcileOutcome) {
        for update in &outcome.updates {
            let row = saved.iter_mut().find(|s| s.id == update.id).unwrap();
            if let Some(title) = &update.title {
                row.title = title.clone();
            }
            if let Some(duration) = &update.duration {
                row.duration = duration.clone();
            }
            if let Some(published_at) = update.published_at {
                row.published_at = published_at;
            }
            if let Some(status) = update.status {
                row.status = status;
            }
            if let Some(kind) = update.kind {
                row.kind = kind;
            }
            if update.undelete {
                row.deleted_at = None;
            }
        }
        for insert in &outcome.inserts {
            saved.push(SavedVideo {
                id: Uuid::new_v4(),
                external_id: insert.external_id.clone(),
                channel_id: Uuid::new_v4(),
                title: insert.title.clone(),
                duration: insert.duration.clone(),
                published_at: insert.published_at,
                status: insert.status,
                kind: insert.kind,
                thumbnail: None,
                deleted_at: None,
            });
        }
    }

    #[test]
    fn scenario_a_new_live_video_is_inserted() {
        let mut rec = record("v1");
        rec.title = "T1".to_string();
        rec.duration = "PT10M".to_string();
        rec.live = Some(LiveStreamingDetails {
            actual_start: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        });

        let outcome = reconcile(&[rec], &[], now());

        assert_eq!(outcome.inserts.len(), 1);
        let insert = &outcome.inserts[0];
        assert_eq!(insert.external_id, "v1");
        assert_eq!(insert.status, VideoStatus::Live);
        assert_eq!(insert.kind, VideoKind::Standard);
        assert_eq!(
            insert.published_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert!(outcome.updates.is_empty());
        assert!(outcome.unavailable_ids.is_empty());
    }

    #[test]
    fn scenario_b_missing_remote_marks_saved_unavailable() {
        let saved = saved_from(&record("v1"));
        let outcome = reconcile(&[], std::slice::from_ref(&saved), now());

        assert_eq!(outcome.unavailable_ids, vec![saved.id]);
        assert!(outcome.inserts.is_empty());
        assert!(outcome.updates.is_empty());
    }

    #[test]
    fn scenario_c_title_change_updates_only_title() {
        let mut saved = saved_from(&record("v1"));
        saved.title = "Old Title".to_string();
        let mut rec = record("v1");
        rec.title = "New Title".to_string();

        let outcome = reconcile(&[rec], std::slice::from_ref(&saved), now());

        assert_eq!(outcome.updates.len(), 1);
        let update = &outcome.updates[0];
        assert_eq!(update.id, saved.id);
        assert_eq!(update.title.as_deref(), Some("New Title"));
        assert_eq!(update.changed_fields(), vec!["title"]);
        assert_eq!(update.updated_at, now());
        assert!(outcome.inserts.is_empty());
    }

    #[test]
    fn unchanged_video_produces_nothing() {
        let rec = record("v1");
        let saved = saved_from(&rec);
        assert!(reconcile(&[rec], &[saved], now()).is_empty());
    }

    #[test]
    fn soft_deleted_video_is_undeleted_even_without_changes() {
        let rec = record("v1");
        let mut saved = saved_from(&rec);
        saved.deleted_at = Some(now() - Duration::days(1));

        let outcome = reconcile(&[rec], &[saved], now());

        assert_eq!(outcome.updates.len(), 1);
        assert!(outcome.updates[0].undelete);
        assert_eq!(outcome.updates[0].changed_fields(), vec!["deleted_at"]);
    }

    #[test]
    fn out_of_order_status_is_corrected() {
        // Saved as UPCOMING, observed already ended without ever being LIVE.
        let mut rec = record("v1");
        rec.live = Some(LiveStreamingDetails {
            scheduled_start: Some(now() - Duration::hours(3)),
            actual_start: Some(now() - Duration::hours(2)),
            actual_end: Some(now() - Duration::hours(1)),
        });
        let mut saved = saved_from(&rec);
        saved.status = VideoStatus::Upcoming;

        let outcome = reconcile(&[rec], &[saved], now());
        assert_eq!(outcome.updates[0].status, Some(VideoStatus::Ended));
    }

    #[test]
    fn published_at_compares_instants() {
        let rec = record("v1");
        let mut saved = saved_from(&rec);
        // Same instant expressed through a different offset is not a change.
        saved.published_at = rec
            .published_at()
            .unwrap()
            .with_timezone(&chrono::FixedOffset::east_opt(9 * 3600).unwrap())
            .with_timezone(&Utc);
        assert!(reconcile(std::slice::from_ref(&rec), &[saved.clone()], now()).is_empty());

        saved.published_at -= Duration::seconds(1);
        let outcome = reconcile(&[rec], &[saved], now());
        assert_eq!(outcome.updates[0].changed_fields(), vec!["published_at"]);
    }

    #[test]
    fn missing_remote_publish_time_is_not_a_change() {
        let rec = record("v1");
        let saved = saved_from(&rec);
        let mut stripped = rec.clone();
        stripped.snippet_published_at = None;
        assert!(reconcile(&[stripped], &[saved], now()).is_empty());
    }

    #[test]
    fn new_video_without_publish_time_is_dropped() {
        let mut rec = record("v9");
        rec.snippet_published_at = None;

        let outcome = reconcile(&[rec], &[], now());
        assert!(outcome.inserts.is_empty());
        assert_eq!(outcome.dropped, vec!["v9"]);
    }

    #[test]
    fn duration_change_also_reclassifies_kind() {
        let rec_long = record("v1");
        let saved = saved_from(&rec_long);
        let mut rec_short = rec_long.clone();
        rec_short.duration = "PT45S".to_string();

        let update = &reconcile(&[rec_short], &[saved], now()).updates[0];
        assert_eq!(update.duration.as_deref(), Some("PT45S"));
        assert_eq!(update.kind, Some(VideoKind::Short));
    }

    #[test]
    fn duplicate_remote_records_keep_first() {
        let first = record("v1");
        let mut second = record("v1");
        second.title = "Second".to_string();

        let outcome = reconcile(&[first, second], &[], now());
        assert_eq!(outcome.inserts.len(), 1);
        assert_eq!(outcome.inserts[0].title, "Title v1");
    }

    #[test]
    fn reconcile_is_idempotent_once_applied() {
        let mut changed = record("v1");
        changed.title = "Renamed".to_string();
        let remote = vec![changed, record("v2"), record("v3")];
        let mut saved = vec![saved_from(&record("v1")), saved_from(&record("v4"))];
        saved[1].deleted_at = Some(now());

        let first = reconcile(&remote, &saved, now());
        assert_eq!(first.updates.len(), 1);
        assert_eq!(first.inserts.len(), 2);
        apply(&mut saved, &first);

        let second = reconcile(&remote, &saved, now());
        assert!(second.updates.is_empty());
        assert!(second.inserts.is_empty());

        // Same inputs, same output.
        let again = reconcile(&remote, &saved, now());
        assert_eq!(second, again);
    }

    #[test]
    fn unavailable_is_exact_set_difference_regardless_of_order() {
        let saved: Vec<SavedVideo> = (0..8)
            .map(|i| saved_from(&record(&format!("v{i}"))))
            .collect();
        let remote_ids = ["v7", "v1", "v9", "v3", "v5"];

        for rotation in 0..remote_ids.len() {
            let mut ids = remote_ids.to_vec();
            ids.rotate_left(rotation);
            let remote: Vec<RemoteRecord> = ids.iter().map(|id| record(id)).collect();

            let outcome = reconcile(&remote, &saved, now());

            let expected: Vec<Uuid> = saved
                .iter()
                .filter(|s| !remote_ids.contains(&s.external_id.as_str()))
                .map(|s| s.id)
                .collect();
            assert_eq!(outcome.unavailable_ids, expected);
        }
    }
}
