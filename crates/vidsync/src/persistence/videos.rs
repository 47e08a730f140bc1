//! Writing reconciled videos.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::video;
use crate::reconcile::{VideoInsert, VideoUpdate};

use super::errors::{PersistenceError, Result};
use super::links::link_external_id;
use super::retry::{describe, retry_write};

/// One row of a video write-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoWrite {
    Update(VideoUpdate),
    Insert(VideoInsert),
}

impl VideoWrite {
    /// Internal id, known only for rows that already exist.
    pub fn id(&self) -> Option<Uuid> {
        match self {
            VideoWrite::Update(u) => Some(u.id),
            VideoWrite::Insert(_) => None,
        }
    }

    pub fn external_id(&self) -> &str {
        match self {
            VideoWrite::Update(u) => &u.external_id,
            VideoWrite::Insert(i) => &i.external_id,
        }
    }
}

/// Channel that owns newly inserted videos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: Uuid,
    pub external_id: String,
}

/// Which write path a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    Update,
    Insert,
}

/// A row (by external id) that could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub path: WritePath,
    pub external_id: String,
    pub error: String,
}

/// A newly inserted and linked video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedVideo {
    pub id: Uuid,
    pub external_id: String,
}

/// Result of [`upsert_videos`]. Failures on one path never hide the other's
/// successes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct UpsertOutcome {
    pub updated: Vec<Uuid>,
    pub inserted: Vec<InsertedVideo>,
    pub failures: Vec<WriteFailure>,
}

impl UpsertOutcome {
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded_count(&self) -> usize {
        self.updated.len() + self.inserted.len()
    }

    /// Collapse into a `PartialFailure` error when anything failed.
    pub fn into_result(self) -> Result<Self> {
        if self.has_errors() {
            Err(PersistenceError::PartialFailure {
                succeeded: self.succeeded_count(),
                failed: self.failed_count(),
            })
        } else {
            Ok(self)
        }
    }
}

/// Persist a video write-set.
///
/// Rows with an internal id take the update path, the rest take the insert
/// path. Both paths run concurrently. Every insert is committed together with
/// its external id link. Inserts need an owning `channel`; without one they
/// are reported as failures. Inserted rows are stamped with `now`.
pub async fn upsert_videos(
    db: &DatabaseConnection,
    rows: Vec<VideoWrite>,
    channel: Option<&ChannelRef>,
    now: DateTime<Utc>,
) -> UpsertOutcome {
    let (updates, inserts): (Vec<_>, Vec<_>) = rows.into_iter().partition(|r| r.id().is_some());
    let updates: Vec<VideoUpdate> = updates
        .into_iter()
        .filter_map(|r| match r {
            VideoWrite::Update(u) => Some(u),
            VideoWrite::Insert(_) => None,
        })
        .collect();
    let inserts: Vec<VideoInsert> = inserts
        .into_iter()
        .filter_map(|r| match r {
            VideoWrite::Insert(i) => Some(i),
            VideoWrite::Update(_) => None,
        })
        .collect();

    let (update_part, insert_part) = tokio::join!(
        apply_updates(db, updates),
        apply_inserts(db, inserts, channel, now)
    );

    let mut outcome = UpsertOutcome::default();
    outcome.updated = update_part.0;
    outcome.failures.extend(update_part.1);
    outcome.inserted = insert_part.0;
    outcome.failures.extend(insert_part.1);

    tracing::debug!(
        updated = outcome.updated.len(),
        inserted = outcome.inserted.len(),
        failed = outcome.failures.len(),
        "videos persisted"
    );
    outcome
}

async fn apply_updates(
    db: &DatabaseConnection,
    updates: Vec<VideoUpdate>,
) -> (Vec<Uuid>, Vec<WriteFailure>) {
    let mut updated = Vec::with_capacity(updates.len());
    let mut failures = Vec::new();

    for update in updates {
        match retry_write("videos.update", || update_video(db, &update)).await {
            Ok(()) => updated.push(update.id),
            Err(e) => {
                tracing::warn!(video_id = %update.id, error = %e, "video update failed");
                failures.push(WriteFailure {
                    path: WritePath::Update,
                    external_id: update.external_id.clone(),
                    error: describe(&e),
                });
            }
        }
    }

    (updated, failures)
}

/// Write only the changed columns of one video.
pub async fn update_video(db: &DatabaseConnection, update: &VideoUpdate) -> Result<()> {
    let mut query = video::Entity::update_many()
        .col_expr(video::Column::UpdatedAt, Expr::value(update.updated_at))
        .filter(video::Column::Id.eq(update.id));

    if let Some(title) = &update.title {
        query = query.col_expr(video::Column::Title, Expr::value(title.clone()));
    }
    if let Some(duration) = &update.duration {
        query = query.col_expr(video::Column::Duration, Expr::value(duration.clone()));
    }
    if let Some(published_at) = update.published_at {
        query = query.col_expr(video::Column::PublishedAt, Expr::value(published_at));
    }
    if let Some(status) = update.status {
        query = query.col_expr(video::Column::Status, Expr::value(status));
    }
    if let Some(kind) = update.kind {
        query = query.col_expr(video::Column::Kind, Expr::value(kind));
    }
    if let Some(thumbnail_id) = update.thumbnail_id {
        query = query.col_expr(video::Column::ThumbnailId, Expr::value(thumbnail_id));
    }
    if update.undelete {
        query = query.col_expr(
            video::Column::DeletedAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        );
    }

    let result = query.exec(db).await?;
    if result.rows_affected == 0 {
        return Err(PersistenceError::not_found_by_id(update.id));
    }
    Ok(())
}

fn insert_model(
    insert: &VideoInsert,
    channel: &ChannelRef,
    now: DateTime<Utc>,
) -> (Uuid, video::ActiveModel) {
    let id = Uuid::new_v4();
    let now = now.fixed_offset();
    let model = video::ActiveModel {
        id: Set(id),
        channel_id: Set(channel.id),
        title: Set(insert.title.clone()),
        duration: Set(insert.duration.clone()),
        published_at: Set(insert.published_at.fixed_offset()),
        status: Set(insert.status),
        kind: Set(insert.kind),
        visible: Set(true),
        thumbnail_id: Set(insert.thumbnail_id),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    (id, model)
}

/// Insert a group of videos and their links in one transaction.
async fn insert_group(
    db: &DatabaseConnection,
    group: &[VideoInsert],
    channel: &ChannelRef,
    now: DateTime<Utc>,
) -> Result<Vec<InsertedVideo>> {
    let (ids, models): (Vec<Uuid>, Vec<video::ActiveModel>) = group
        .iter()
        .map(|insert| insert_model(insert, channel, now))
        .unzip();

    let txn = db.begin().await?;
    video::Entity::insert_many(models)
        .exec_without_returning(&txn)
        .await?;
    for (id, insert) in ids.iter().zip(group) {
        let channel_external_id = insert
            .channel_external_id
            .as_deref()
            .unwrap_or(&channel.external_id);
        link_external_id(&txn, *id, &insert.external_id, channel_external_id).await?;
    }
    txn.commit().await?;

    Ok(ids
        .into_iter()
        .zip(group)
        .map(|(id, insert)| InsertedVideo {
            id,
            external_id: insert.external_id.clone(),
        })
        .collect())
}

/// Insert path: one transaction for the whole batch, falling back to one
/// transaction per row so a single bad row cannot sink its siblings.
async fn apply_inserts(
    db: &DatabaseConnection,
    inserts: Vec<VideoInsert>,
    channel: Option<&ChannelRef>,
    now: DateTime<Utc>,
) -> (Vec<InsertedVideo>, Vec<WriteFailure>) {
    if inserts.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let Some(channel) = channel else {
        let failures = inserts
            .into_iter()
            .map(|insert| WriteFailure {
                path: WritePath::Insert,
                external_id: insert.external_id,
                error: "no owning channel for new video".to_string(),
            })
            .collect();
        return (Vec::new(), failures);
    };

    match retry_write("videos.insert", || insert_group(db, &inserts, channel, now)).await {
        Ok(inserted) => return (inserted, Vec::new()),
        Err(e) if inserts.len() == 1 => {
            tracing::warn!(
                external_id = %inserts[0].external_id,
                error = %e,
                "video insert failed",
            );
            return (
                Vec::new(),
                vec![WriteFailure {
                    path: WritePath::Insert,
                    external_id: inserts[0].external_id.clone(),
                    error: describe(&e),
                }],
            );
        }
        Err(e) => {
            tracing::warn!(
                count = inserts.len(),
                error = %e,
                "batch video insert failed, retrying row by row"
            );
        }
    }

    let mut inserted = Vec::with_capacity(inserts.len());
    let mut failures = Vec::new();
    for insert in &inserts {
        let single = std::slice::from_ref(insert);
        match retry_write("videos.insert", || insert_group(db, single, channel, now)).await {
            Ok(rows) => inserted.extend(rows),
            Err(e) => {
                tracing::warn!(
                    external_id = %insert.external_id,
                    error = %e,
                    "video insert failed",
                );
                failures.push(WriteFailure {
                    path: WritePath::Insert,
                    external_id: insert.external_id.clone(),
                    error: describe(&e),
                });
            }
        }
    }
    (inserted, failures)
}
