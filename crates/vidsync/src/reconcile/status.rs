//! Derived video fields: lifecycle status and format.

use chrono::{DateTime, Utc};

use crate::catalog::LiveStreamingDetails;
use crate::entity::video_kind::VideoKind;
use crate::entity::video_status::VideoStatus;

/// Longest duration, in seconds, still classified as a short.
pub const SHORT_MAX_SECONDS: f64 = 180.0;

/// Lifecycle status from live-streaming timestamps.
///
/// An actual end means `ENDED`; an actual start without an end means `LIVE`;
/// a scheduled start still in the future means `UPCOMING`. Anything else,
/// including plain uploads and missed schedules, is `ENDED`.
pub fn derive_status(live: Option<&LiveStreamingDetails>, now: DateTime<Utc>) -> VideoStatus {
    let Some(live) = live else {
        return VideoStatus::Ended;
    };
    if live.actual_end.is_some() {
        return VideoStatus::Ended;
    }
    if live.actual_start.is_some() {
        return VideoStatus::Live;
    }
    match live.scheduled_start {
        Some(scheduled) if scheduled > now => VideoStatus::Upcoming,
        _ => VideoStatus::Ended,
    }
}

/// `Short` for durations in `(0, 180]` seconds, `Standard` otherwise.
pub fn derive_kind(duration: &str) -> VideoKind {
    match parse_iso8601_duration(duration) {
        Some(secs) if secs > 0.0 && secs <= SHORT_MAX_SECONDS => VideoKind::Short,
        _ => VideoKind::Standard,
    }
}

/// Total seconds of an ISO-8601 duration such as `PT1H2M3.5S` or `P1DT2H`.
///
/// Year and month designators are rejected because their length is not fixed.
pub fn parse_iso8601_duration(raw: &str) -> Option<f64> {
    let rest = raw.trim().strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return None;
            }
            (date, Some(time))
        }
        None => (rest, None),
    };

    let mut total = 0.0;
    total += sum_components(date_part, &[('W', 604_800.0), ('D', 86_400.0)])?;
    if let Some(time) = time_part {
        total += sum_components(time, &[('H', 3_600.0), ('M', 60.0), ('S', 1.0)])?;
    }
    if date_part.is_empty() && time_part.is_none() {
        return None;
    }
    Some(total)
}

fn sum_components(part: &str, units: &[(char, f64)]) -> Option<f64> {
    let mut total = 0.0;
    let mut number = String::new();
    let mut next_unit = 0;

    for ch in part.chars() {
        if ch.is_ascii_digit() || ch == '.' || ch == ',' {
            number.push(if ch == ',' { '.' } else { ch });
            continue;
        }
        // Designators must appear in order, each at most once.
        let offset = units[next_unit..].iter().position(|(u, _)| *u == ch)?;
        let (_, factor) = units[next_unit + offset];
        let value: f64 = number.parse().ok()?;
        total += value * factor;
        number.clear();
        next_unit += offset + 1;
    }

    if number.is_empty() { Some(total) } else { None }
}
