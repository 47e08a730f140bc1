use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entity::video_kind::VideoKind;
use crate::entity::video_status::VideoStatus;

/// Stored thumbnail state as seen by reconciliation and the thumbnail pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedThumbnail {
    pub id: Uuid,
    pub path: String,
    pub width: i32,
    pub height: i32,
    pub blur_data_url: String,
    pub etag: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SavedThumbnail {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A stored video joined with its external id and thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedVideo {
    pub id: Uuid,
    pub external_id: String,
    pub channel_id: Uuid,
    pub title: String,
    pub duration: String,
    pub published_at: DateTime<Utc>,
    pub status: VideoStatus,
    pub kind: VideoKind,
    pub thumbnail: Option<SavedThumbnail>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SavedVideo {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Changes to apply to an existing video. Only `Some` fields are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUpdate {
    pub id: Uuid,
    pub external_id: String,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub status: Option<VideoStatus>,
    pub kind: Option<VideoKind>,
    /// Attach a (new) thumbnail row.
    pub thumbnail_id: Option<Uuid>,
    /// Clear the soft-delete marker.
    pub undelete: bool,
    pub updated_at: DateTime<Utc>,
}

impl VideoUpdate {
    /// An update that only refreshes `updated_at`.
    pub fn touch(id: Uuid, external_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            external_id: external_id.into(),
            title: None,
            duration: None,
            published_at: None,
            status: None,
            kind: None,
            thumbnail_id: None,
            undelete: false,
            updated_at: now,
        }
    }

    /// Names of the fields this update changes, for logging.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.duration.is_some() {
            fields.push("duration");
        }
        if self.published_at.is_some() {
            fields.push("published_at");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.kind.is_some() {
            fields.push("kind");
        }
        if self.thumbnail_id.is_some() {
            fields.push("thumbnail_id");
        }
        if self.undelete {
            fields.push("deleted_at");
        }
        fields
    }
}

/// A video seen remotely for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInsert {
    pub external_id: String,
    pub channel_external_id: Option<String>,
    pub title: String,
    pub duration: String,
    pub published_at: DateTime<Utc>,
    pub status: VideoStatus,
    pub kind: VideoKind,
    pub thumbnail_id: Option<Uuid>,
}

/// Write-set produced by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct ReconcileOutcome {
    pub updates: Vec<VideoUpdate>,
    pub inserts: Vec<VideoInsert>,
    /// Internal ids of saved videos absent from the remote set.
    pub unavailable_ids: Vec<Uuid>,
    /// External ids of new remote videos skipped for lack of a publish time.
    pub dropped: Vec<String>,
}

impl ReconcileOutcome {
    /// True when nothing needs to be written.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty() && self.unavailable_ids.is_empty()
    }
}
