//! Video entity - the canonical record for one remote video.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::video_kind::VideoKind;
use crate::entity::video_status::VideoStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "videos")]
pub struct Model {
    /// Internal UUID primary key. Never derived from the remote id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Ownership ───────────────────────────────────────────────────────────
    /// Tracked channel this video was discovered through.
    pub channel_id: Uuid,

    // ─── Content ─────────────────────────────────────────────────────────────
    pub title: String,
    /// ISO-8601 duration (`PT1H2M3S`), `P0D` when unknown.
    pub duration: String,
    /// Actual start, scheduled start or upload time, whichever is known first.
    pub published_at: DateTimeWithTimeZone,
    pub status: VideoStatus,
    pub kind: VideoKind,

    // ─── Presentation ────────────────────────────────────────────────────────
    /// Editorial visibility flag. Sync never changes it.
    #[sea_orm(default_value = true)]
    pub visible: bool,
    pub thumbnail_id: Option<Uuid>,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    /// Soft-delete marker; `None` means the video is live in the catalog.
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::youtube_channel::Entity",
        from = "Column::ChannelId",
        to = "super::youtube_channel::Column::Id"
    )]
    Channel,
    #[sea_orm(
        belongs_to = "super::thumbnail::Entity",
        from = "Column::ThumbnailId",
        to = "super::thumbnail::Column::Id"
    )]
    Thumbnail,
    #[sea_orm(has_one = "super::youtube_video::Entity")]
    YoutubeVideo,
}

impl Related<super::youtube_channel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Channel.def()
    }
}

impl Related<super::thumbnail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Thumbnail.def()
    }
}

impl Related<super::youtube_video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::YoutubeVideo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
