//! The video ↔ external id link table.
//!
//! A video without a link is invisible to reconciliation: the next run would
//! see its remote record as new and insert a duplicate. Links are therefore
//! written in the same transaction as the video insert, and
//! [`repair_links`] re-attaches any rows that still end up unlinked.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::catalog::RemoteRecord;
use crate::entity::{video, youtube_video};

use super::errors::Result;

/// Attach `external_id` to a video, replacing any existing link of that video.
///
/// Works on a plain connection or inside a transaction.
pub async fn link_external_id<C: ConnectionTrait>(
    conn: &C,
    video_id: Uuid,
    external_id: &str,
    channel_external_id: &str,
) -> Result<()> {
    let link = youtube_video::ActiveModel {
        id: Set(Uuid::new_v4()),
        video_id: Set(video_id),
        youtube_video_id: Set(external_id.to_string()),
        youtube_channel_id: Set(channel_external_id.to_string()),
    };

    youtube_video::Entity::insert(link)
        .on_conflict(
            OnConflict::column(youtube_video::Column::VideoId)
                .update_columns([
                    youtube_video::Column::YoutubeVideoId,
                    youtube_video::Column::YoutubeChannelId,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Video rows of a channel that have no link.
pub async fn find_unlinked_videos(
    db: &DatabaseConnection,
    channel_id: Uuid,
) -> Result<Vec<video::Model>> {
    Ok(video::Entity::find()
        .join(JoinType::LeftJoin, video::Relation::YoutubeVideo.def())
        .filter(video::Column::ChannelId.eq(channel_id))
        .filter(youtube_video::Column::Id.is_null())
        .all(db)
        .await?)
}

/// A link restored by [`repair_links`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedLink {
    pub video_id: Uuid,
    pub external_id: String,
}

/// Re-link unlinked videos of a channel to the remote records they came from.
///
/// A row matches a remote record when title and publish instant agree and the
/// record's external id is not linked yet. Each record is used at most once.
pub async fn repair_links(
    db: &DatabaseConnection,
    channel_id: Uuid,
    channel_external_id: &str,
    remote: &[RemoteRecord],
) -> Result<Vec<RepairedLink>> {
    let unlinked = find_unlinked_videos(db, channel_id).await?;
    if unlinked.is_empty() {
        return Ok(Vec::new());
    }

    let candidate_ids: Vec<String> = remote.iter().map(|r| r.external_id.clone()).collect();
    let mut taken: HashSet<String> = HashSet::new();
    for chunk in candidate_ids.chunks(super::saved::LOOKUP_CHUNK_SIZE) {
        let linked: Vec<String> = youtube_video::Entity::find()
            .select_only()
            .column(youtube_video::Column::YoutubeVideoId)
            .filter(youtube_video::Column::YoutubeVideoId.is_in(chunk.iter().cloned()))
            .into_tuple()
            .all(db)
            .await?;
        taken.extend(linked);
    }

    let mut repaired = Vec::new();
    for row in unlinked {
        let published_at = row.published_at.with_timezone(&Utc);
        let Some(record) = remote.iter().find(|r| {
            !taken.contains(&r.external_id)
                && r.title == row.title
                && r.published_at() == Some(published_at)
        }) else {
            continue;
        };

        link_external_id(db, row.id, &record.external_id, channel_external_id).await?;
        tracing::info!(
            video_id = %row.id,
            external_id = %record.external_id,
            "re-linked orphaned video"
        );
        taken.insert(record.external_id.clone());
        repaired.push(RepairedLink {
            video_id: row.id,
            external_id: record.external_id.clone(),
        });
    }

    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn link_external_id_issues_single_upsert() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                last_insert_id: 0,
            }])
            .into_connection();

        link_external_id(&db, Uuid::new_v4(), "v1", "UC1")
            .await
            .expect("link insert");

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("ON CONFLICT"), "{sql}");
        assert!(sql.contains("youtube_videos"), "{sql}");
    }
}
