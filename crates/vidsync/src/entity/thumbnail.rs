//! Thumbnail entity - stored image metadata for a video.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "thumbnails")]
pub struct Model {
    /// Stable across re-uploads of the same remote image.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Blob storage path, `{video_id}/{suffix}.{ext}`.
    pub path: String,
    pub width: i32,
    pub height: i32,
    /// Tiny JPEG preview as a `data:` URL.
    #[sea_orm(column_type = "Text")]
    pub blur_data_url: String,
    /// ETag of the remote image, sent back as `If-None-Match`.
    #[sea_orm(column_type = "Text", nullable)]
    pub etag: Option<String>,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::video::Entity")]
    Video,
}

impl Related<super::video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Video.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
