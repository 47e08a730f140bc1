//! The externally scheduled entry point for sync runs.
//!
//! A scheduler calls [`handle_trigger`] with a mode and a shared secret and
//! gets back an HTTP-style status plus a JSON body of counts. Transport and
//! routing are left to the caller.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::sync::{CheckMode, SyncEngine, SyncReport};

/// Errors listed in a response body, at most.
pub const MAX_REPORTED_ERRORS: usize = 20;

/// What a trigger asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    Update,
    Check(CheckMode),
}

impl TriggerMode {
    /// Check mode from an `all` query value: `1`, `true` or `yes` sweeps
    /// everything, anything else (or nothing) checks recent videos.
    pub fn from_query(all: Option<&str>) -> Self {
        let all = all
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        if all {
            Self::Check(CheckMode::All)
        } else {
            Self::Check(CheckMode::Recent)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Check(CheckMode::Recent) => "recent",
            Self::Check(CheckMode::All) => "all",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TriggerRequest {
    pub mode: TriggerMode,
    /// Shared secret sent by the scheduler.
    pub secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerResponse {
    pub status: u16,
    pub body: Value,
}

impl TriggerResponse {
    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "ok": false, "error": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Rejects overlapping runs.
///
/// Update runs and check runs hold separate flags; both check modes share
/// one since they touch the same rows.
#[derive(Debug, Default)]
pub struct TriggerGuard {
    update: AtomicBool,
    check: AtomicBool,
}

impl TriggerGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, mode: TriggerMode) -> &AtomicBool {
        match mode {
            TriggerMode::Update => &self.update,
            TriggerMode::Check(_) => &self.check,
        }
    }

    /// Claim the flag for `mode`, or `None` when a run already holds it.
    pub fn try_acquire(&self, mode: TriggerMode) -> Option<RunPermit<'_>> {
        let flag = self.flag(mode);
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit { flag })
    }

    pub fn is_running(&self, mode: TriggerMode) -> bool {
        self.flag(mode).load(Ordering::Acquire)
    }
}

/// Held for the length of a run; releases its flag on drop.
#[derive(Debug)]
pub struct RunPermit<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Compare secrets through their SHA-256 digests so the comparison does not
/// depend on where the first differing byte sits.
fn secret_matches(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn authorized(request: &TriggerRequest, expected: Option<&str>) -> bool {
    match expected.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(expected) => request
            .secret
            .as_deref()
            .is_some_and(|provided| secret_matches(provided, expected)),
    }
}

fn report_body(mode: TriggerMode, report: &SyncReport) -> Value {
    let errors: Vec<&String> = report.errors.iter().take(MAX_REPORTED_ERRORS).collect();
    json!({
        "ok": true,
        "mode": mode.as_str(),
        "processed": report.processed,
        "inserted": report.inserted,
        "updated": report.updated,
        "deleted": report.deleted,
        "thumbnails": report.thumbnails,
        "failed": report.failed,
        "dropped": report.dropped,
        "repaired": report.repaired,
        "partial": report.partial,
        "aborted": report.aborted,
        "changed": report.has_changes(),
        "errors": errors,
    })
}

/// Authorize, run and summarize one sync.
///
/// Partial success is still a 200 with a nonzero `failed`; only run-level
/// errors become a 500.
pub async fn handle_trigger(
    engine: &SyncEngine,
    guard: &TriggerGuard,
    request: TriggerRequest,
    expected_secret: Option<&str>,
    now: DateTime<Utc>,
) -> TriggerResponse {
    if !authorized(&request, expected_secret) {
        tracing::warn!(mode = request.mode.as_str(), "trigger rejected: bad secret");
        return TriggerResponse::error(401, "unauthorized");
    }

    let Some(_permit) = guard.try_acquire(request.mode) else {
        tracing::info!(mode = request.mode.as_str(), "trigger rejected: run in progress");
        return TriggerResponse::error(429, "a run of this kind is already in progress");
    };

    tracing::info!(mode = request.mode.as_str(), "sync triggered");
    let result = match request.mode {
        TriggerMode::Update => engine.run_update(now).await,
        TriggerMode::Check(mode) => engine.run_check(mode, now).await,
    };

    match result {
        Ok(report) => {
            tracing::info!(
                mode = request.mode.as_str(),
                inserted = report.inserted,
                updated = report.updated,
                deleted = report.deleted,
                failed = report.failed,
                "sync finished"
            );
            TriggerResponse {
                status: 200,
                body: report_body(request.mode, &report),
            }
        }
        Err(e) => {
            tracing::error!(mode = request.mode.as_str(), error = %e, "sync failed");
            TriggerResponse::error(500, e.short_message())
        }
    }
}
