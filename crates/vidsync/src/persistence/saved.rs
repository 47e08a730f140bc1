//! Loading saved videos for reconciliation.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entity::{thumbnail, video, youtube_video};
use crate::reconcile::{SavedThumbnail, SavedVideo};

use super::errors::Result;

/// Rows per `IN (...)` lookup.
pub const LOOKUP_CHUNK_SIZE: usize = 100;

/// Tracked videos read by a recent check.
pub const RECENT_TRACKED_LIMIT: u64 = 100;

/// Page size when sweeping every tracked video.
pub const ALL_TRACKED_PAGE_SIZE: u64 = 2000;

/// Which tracked videos a check run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackedScope {
    /// The most recently published videos.
    #[default]
    Recent,
    /// Every non-deleted video.
    All,
}

/// Build the reconciliation view of one stored video.
///
/// The thumbnail arrives as an optional related row and is flattened here so
/// nothing downstream sees the join shape.
pub fn to_saved_video(
    link: &youtube_video::Model,
    video: video::Model,
    thumb: Option<thumbnail::Model>,
) -> SavedVideo {
    SavedVideo {
        id: video.id,
        external_id: link.youtube_video_id.clone(),
        channel_id: video.channel_id,
        title: video.title,
        duration: video.duration,
        published_at: video.published_at.with_timezone(&Utc),
        status: video.status,
        kind: video.kind,
        thumbnail: thumb.map(to_saved_thumbnail),
        deleted_at: video.deleted_at.map(|d| d.with_timezone(&Utc)),
    }
}

pub fn to_saved_thumbnail(model: thumbnail::Model) -> SavedThumbnail {
    SavedThumbnail {
        id: model.id,
        path: model.path,
        width: model.width,
        height: model.height,
        blur_data_url: model.blur_data_url,
        etag: model.etag,
        deleted_at: model.deleted_at.map(|d| d.with_timezone(&Utc)),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Saved videos (soft-deleted included) whose external id is in `external_ids`.
///
/// Lookups go through the link table in chunks of [`LOOKUP_CHUNK_SIZE`].
/// External ids with no link are simply absent from the result.
pub async fn load_saved_videos(
    db: &DatabaseConnection,
    external_ids: &[String],
) -> Result<Vec<SavedVideo>> {
    let mut saved = Vec::with_capacity(external_ids.len());

    for chunk in external_ids.chunks(LOOKUP_CHUNK_SIZE) {
        let links = youtube_video::Entity::find()
            .filter(youtube_video::Column::YoutubeVideoId.is_in(chunk.iter().cloned()))
            .all(db)
            .await?;
        if links.is_empty() {
            continue;
        }

        let video_ids: Vec<_> = links.iter().map(|l| l.video_id).collect();
        let mut rows: HashMap<_, _> = video::Entity::find()
            .filter(video::Column::Id.is_in(video_ids))
            .find_also_related(thumbnail::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|(video, thumb)| (video.id, (video, thumb)))
            .collect();

        for link in &links {
            if let Some((video, thumb)) = rows.remove(&link.video_id) {
                saved.push(to_saved_video(link, video, thumb));
            }
        }
    }

    Ok(saved)
}

/// External ids of live (non-deleted) videos, newest first.
pub async fn load_tracked_external_ids(
    db: &DatabaseConnection,
    scope: TrackedScope,
) -> Result<Vec<String>> {
    let page_size = match scope {
        TrackedScope::Recent => RECENT_TRACKED_LIMIT,
        TrackedScope::All => ALL_TRACKED_PAGE_SIZE,
    };

    let mut ids = Vec::new();
    let mut offset = 0u64;
    loop {
        let page = video::Entity::find()
            .filter(video::Column::DeletedAt.is_null())
            .order_by_desc(video::Column::PublishedAt)
            .order_by_asc(video::Column::Id)
            .find_also_related(youtube_video::Entity)
            .offset(offset)
            .limit(page_size)
            .all(db)
            .await?;

        let fetched = page.len() as u64;
        ids.extend(
            page.into_iter()
                .filter_map(|(_, link)| link.map(|l| l.youtube_video_id)),
        );

        if scope == TrackedScope::Recent || fetched < page_size {
            break;
        }
        offset += page_size;
    }

    Ok(ids)
}
