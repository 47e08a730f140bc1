//! Writing thumbnail rows.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use crate::entity::thumbnail;

use super::errors::Result;
use super::retry::{describe, retry_write};

/// A thumbnail write produced by the thumbnail pipeline.
///
/// `id` is set when an existing row is being refreshed; new rows get a fresh
/// id on insert. `deleted_at` is always written, so a refresh also revives a
/// soft-deleted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRow {
    pub id: Option<Uuid>,
    /// Remote id of the video this thumbnail belongs to.
    pub video_external_id: String,
    pub path: String,
    pub width: i32,
    pub height: i32,
    pub blur_data_url: String,
    pub etag: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// A thumbnail row that is now stored, keyed by its video's external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedThumbnail {
    pub video_external_id: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct ThumbnailUpsertOutcome {
    pub persisted: Vec<PersistedThumbnail>,
    /// `(video external id, error)` for rows that were not written.
    pub failures: Vec<(String, String)>,
}

impl ThumbnailUpsertOutcome {
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Id of the stored thumbnail for a video, if it was written.
    pub fn id_for(&self, video_external_id: &str) -> Option<Uuid> {
        self.persisted
            .iter()
            .find(|p| p.video_external_id == video_external_id)
            .map(|p| p.id)
    }
}

fn active_model(row: &ThumbnailRow, id: Uuid) -> thumbnail::ActiveModel {
    let updated_at = row.updated_at.fixed_offset();
    thumbnail::ActiveModel {
        id: Set(id),
        path: Set(row.path.clone()),
        width: Set(row.width),
        height: Set(row.height),
        blur_data_url: Set(row.blur_data_url.clone()),
        etag: Set(row.etag.clone()),
        deleted_at: Set(row.deleted_at.map(|d| d.fixed_offset())),
        created_at: Set(updated_at),
        updated_at: Set(updated_at),
    }
}

fn refresh_conflict() -> OnConflict {
    OnConflict::column(thumbnail::Column::Id)
        .update_columns([
            thumbnail::Column::Path,
            thumbnail::Column::Width,
            thumbnail::Column::Height,
            thumbnail::Column::BlurDataUrl,
            thumbnail::Column::Etag,
            thumbnail::Column::DeletedAt,
            thumbnail::Column::UpdatedAt,
        ])
        .to_owned()
}

async fn write_one(db: &DatabaseConnection, row: &ThumbnailRow, id: Uuid) -> Result<()> {
    thumbnail::Entity::insert(active_model(row, id))
        .on_conflict(refresh_conflict())
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn write_group(db: &DatabaseConnection, group: &[(Uuid, &ThumbnailRow)]) -> Result<()> {
    let models = group.iter().map(|(id, row)| active_model(row, *id));
    thumbnail::Entity::insert_many(models)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn apply_refreshes(
    db: &DatabaseConnection,
    rows: Vec<(Uuid, ThumbnailRow)>,
) -> (Vec<PersistedThumbnail>, Vec<(String, String)>) {
    let mut persisted = Vec::with_capacity(rows.len());
    let mut failures = Vec::new();
    for (id, row) in rows {
        match retry_write("thumbnails.upsert", || write_one(db, &row, id)).await {
            Ok(()) => persisted.push(PersistedThumbnail {
                video_external_id: row.video_external_id,
                id,
            }),
            Err(e) => {
                tracing::warn!(thumbnail_id = %id, error = %e, "thumbnail update failed");
                failures.push((row.video_external_id, describe(&e)));
            }
        }
    }
    (persisted, failures)
}

async fn apply_creates(
    db: &DatabaseConnection,
    rows: Vec<ThumbnailRow>,
) -> (Vec<PersistedThumbnail>, Vec<(String, String)>) {
    if rows.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let group: Vec<(Uuid, &ThumbnailRow)> = rows.iter().map(|r| (Uuid::new_v4(), r)).collect();

    let into_persisted = |group: &[(Uuid, &ThumbnailRow)]| {
        group
            .iter()
            .map(|(id, row)| PersistedThumbnail {
                video_external_id: row.video_external_id.clone(),
                id: *id,
            })
            .collect::<Vec<_>>()
    };

    match retry_write("thumbnails.insert", || write_group(db, &group)).await {
        Ok(()) => return (into_persisted(&group[..]), Vec::new()),
        Err(e) => {
            tracing::warn!(
                count = group.len(),
                error = %e,
                "thumbnail batch insert failed, retrying row by row",
            );
        }
    }

    let mut persisted = Vec::new();
    let mut failures = Vec::new();
    for entry in &group {
        let single = std::slice::from_ref(entry);
        match retry_write("thumbnails.insert", || write_group(db, single)).await {
            Ok(()) => persisted.extend(into_persisted(single)),
            Err(e) => failures.push((entry.1.video_external_id.clone(), describe(&e))),
        }
    }
    (persisted, failures)
}

/// Store thumbnail rows.
///
/// Rows that carry an id are upserted on that id; rows without one are
/// inserted with a new id. The two groups are written concurrently.
pub async fn upsert_thumbnails(
    db: &DatabaseConnection,
    rows: Vec<ThumbnailRow>,
) -> ThumbnailUpsertOutcome {
    let mut refreshes = Vec::new();
    let mut creates = Vec::new();
    for row in rows {
        match row.id {
            Some(id) => refreshes.push((id, row)),
            None => creates.push(row),
        }
    }

    let (refreshed, created) =
        tokio::join!(apply_refreshes(db, refreshes), apply_creates(db, creates));

    let mut outcome = ThumbnailUpsertOutcome::default();
    for (persisted, failures) in [refreshed, created] {
        outcome.persisted.extend(persisted);
        outcome.failures.extend(failures);
    }
    outcome
}
