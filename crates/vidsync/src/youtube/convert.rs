//! Conversion from YouTube wire types to catalog records.

use chrono::{DateTime, Utc};

use super::types::{ChannelItem, ThumbnailInfo, VideoItem, VideoLiveStreamingDetails};
use crate::catalog::{
    LiveStreamingDetails, RemoteChannel, RemoteRecord, ThumbnailCandidate, ThumbnailSet,
};

/// Duration stored when the API omits one.
pub const ZERO_DURATION: &str = "P0D";

/// Parse an RFC 3339 timestamp. Empty or malformed values are treated as absent.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn to_candidate(info: Option<ThumbnailInfo>) -> Option<ThumbnailCandidate> {
    let info = info?;
    match (info.url, info.width, info.height) {
        (Some(url), Some(width), Some(height)) if !url.is_empty() => Some(ThumbnailCandidate {
            url,
            width,
            height,
        }),
        _ => None,
    }
}

fn to_live_details(live: VideoLiveStreamingDetails) -> LiveStreamingDetails {
    LiveStreamingDetails {
        scheduled_start: parse_timestamp(live.scheduled_start_time.as_deref()),
        actual_start: parse_timestamp(live.actual_start_time.as_deref()),
        actual_end: parse_timestamp(live.actual_end_time.as_deref()),
    }
}

/// Convert a `videos.list` item. Items without an id are skipped.
pub fn to_remote_record(item: VideoItem) -> Option<RemoteRecord> {
    let external_id = item.id.filter(|id| !id.is_empty())?;
    let snippet = item.snippet;

    let (title, channel_external_id, snippet_published_at, thumbnails) = match snippet {
        Some(s) => {
            let thumbnails = s
                .thumbnails
                .map(|t| ThumbnailSet {
                    maxres: to_candidate(t.maxres),
                    standard: to_candidate(t.standard),
                    high: to_candidate(t.high),
                })
                .unwrap_or_default();
            (
                s.title.unwrap_or_default(),
                s.channel_id,
                parse_timestamp(s.published_at.as_deref()),
                thumbnails,
            )
        }
        None => (String::new(), None, None, ThumbnailSet::default()),
    };

    let duration = item
        .content_details
        .and_then(|c| c.duration)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| ZERO_DURATION.to_string());

    Some(RemoteRecord {
        external_id,
        channel_external_id,
        title,
        duration,
        live: item.live_streaming_details.map(to_live_details),
        snippet_published_at,
        thumbnails,
    })
}

/// Convert a `channels.list` item. Channels without an uploads playlist are skipped.
pub fn to_remote_channel(item: ChannelItem) -> Option<RemoteChannel> {
    let external_id = item.id?;
    let uploads_playlist_id = item
        .content_details
        .and_then(|c| c.related_playlists)
        .and_then(|p| p.uploads)
        .filter(|u| !u.is_empty())?;
    let (title, custom_url) = item
        .snippet
        .map(|s| (s.title, s.custom_url))
        .unwrap_or_default();

    Some(RemoteChannel {
        external_id,
        uploads_playlist_id,
        title,
        custom_url,
    })
}
