//! Soft deletion of videos and thumbnails.
//!
//! Rows are never removed. A delete stamps `deleted_at`, and a later sync that
//! sees the video again clears it.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entity::{thumbnail, video};

use super::errors::Result;
use super::retry::{describe, retry_write};
use super::saved::LOOKUP_CHUNK_SIZE;

/// Table a soft delete targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftDeleteTable {
    Videos,
    Thumbnails,
}

impl SoftDeleteTable {
    pub fn as_str(self) -> &'static str {
        match self {
            SoftDeleteTable::Videos => "videos",
            SoftDeleteTable::Thumbnails => "thumbnails",
        }
    }
}

async fn stamp_deleted<E>(
    db: &DatabaseConnection,
    id_col: E::Column,
    deleted_col: E::Column,
    updated_col: E::Column,
    ids: &[Uuid],
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>>
where
    E: EntityTrait,
{
    let mut stamped = Vec::new();
    for chunk in ids.chunks(LOOKUP_CHUNK_SIZE) {
        let live: Vec<Uuid> = E::find()
            .select_only()
            .column(id_col)
            .filter(id_col.is_in(chunk.iter().copied()))
            .filter(deleted_col.is_null())
            .into_tuple()
            .all(db)
            .await?;
        if live.is_empty() {
            continue;
        }

        E::update_many()
            .col_expr(deleted_col, Expr::value(now))
            .col_expr(updated_col, Expr::value(now))
            .filter(id_col.is_in(live.iter().copied()))
            .exec(db)
            .await?;
        stamped.extend(live);
    }
    Ok(stamped)
}

/// Stamp `deleted_at` on the given ids.
///
/// Returns the ids that were live before the call. Already-deleted and unknown
/// ids are skipped, so repeating a delete is harmless.
pub async fn soft_delete(
    db: &DatabaseConnection,
    table: SoftDeleteTable,
    ids: &[Uuid],
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let stamped = match table {
        SoftDeleteTable::Videos => {
            stamp_deleted::<video::Entity>(
                db,
                video::Column::Id,
                video::Column::DeletedAt,
                video::Column::UpdatedAt,
                ids,
                now,
            )
            .await?
        }
        SoftDeleteTable::Thumbnails => {
            stamp_deleted::<thumbnail::Entity>(
                db,
                thumbnail::Column::Id,
                thumbnail::Column::DeletedAt,
                thumbnail::Column::UpdatedAt,
                ids,
                now,
            )
            .await?
        }
    };

    tracing::debug!(table = table.as_str(), count = stamped.len(), "soft-deleted rows");
    Ok(stamped)
}

/// A video to delete together with its current thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftDeleteTarget {
    pub video_id: Uuid,
    pub thumbnail_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct SoftDeleteOutcome {
    /// Videos whose delete (and thumbnail delete, if any) went through.
    pub deleted: Vec<Uuid>,
    /// Videos where either write failed, with the error.
    pub failed: Vec<(Uuid, String)>,
}

impl SoftDeleteOutcome {
    pub fn has_errors(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Soft-delete videos and their thumbnails.
///
/// Targets are written in chunks; within a chunk the video and thumbnail
/// writes run concurrently. A video counts as deleted only when both writes
/// of its chunk succeeded. [`soft_delete_orphaned_thumbnails`] catches
/// thumbnails left behind by a failed pair.
pub async fn soft_delete_videos(
    db: &DatabaseConnection,
    targets: &[SoftDeleteTarget],
    now: DateTime<Utc>,
) -> SoftDeleteOutcome {
    let mut outcome = SoftDeleteOutcome::default();

    for chunk in targets.chunks(LOOKUP_CHUNK_SIZE) {
        let video_ids: Vec<Uuid> = chunk.iter().map(|t| t.video_id).collect();
        let thumbnail_ids: Vec<Uuid> = chunk.iter().filter_map(|t| t.thumbnail_id).collect();

        let (videos, thumbnails) = tokio::join!(
            retry_write("videos.soft_delete", || {
                soft_delete(db, SoftDeleteTable::Videos, &video_ids, now)
            }),
            retry_write("thumbnails.soft_delete", || {
                soft_delete(db, SoftDeleteTable::Thumbnails, &thumbnail_ids, now)
            }),
        );
        let video_error = videos.err().map(|e| describe(&e));
        let thumbnail_error = thumbnails.err().map(|e| describe(&e));

        for target in chunk {
            let error = match (&video_error, target.thumbnail_id) {
                (Some(error), _) => Some(error.clone()),
                (None, Some(_)) => thumbnail_error.clone(),
                (None, None) => None,
            };
            match error {
                Some(error) => {
                    tracing::warn!(
                        video_id = %target.video_id,
                        error = %error,
                        "soft delete failed",
                    );
                    outcome.failed.push((target.video_id, error));
                }
                None => outcome.deleted.push(target.video_id),
            }
        }
    }
    outcome
}

/// Soft-delete live thumbnails that no live video references.
///
/// Covers thumbnails of deleted videos and thumbnails whose video insert never
/// landed.
pub async fn soft_delete_orphaned_thumbnails(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>> {
    let live_reference = Query::select()
        .expr(Expr::val(1))
        .from(video::Entity)
        .and_where(
            Expr::col((video::Entity, video::Column::ThumbnailId))
                .equals((thumbnail::Entity, thumbnail::Column::Id)),
        )
        .and_where(Expr::col((video::Entity, video::Column::DeletedAt)).is_null())
        .to_owned();

    let orphaned: Vec<Uuid> = thumbnail::Entity::find()
        .select_only()
        .column(thumbnail::Column::Id)
        .filter(thumbnail::Column::DeletedAt.is_null())
        .filter(Expr::exists(live_reference).not())
        .into_tuple()
        .all(db)
        .await?;

    soft_delete(db, SoftDeleteTable::Thumbnails, &orphaned, now).await
}
