//! Tracked channel rows.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::catalog::RemoteChannel;
use crate::entity::youtube_channel;

use super::errors::{PersistenceError, Result};
use super::videos::ChannelRef;

impl From<&youtube_channel::Model> for ChannelRef {
    fn from(model: &youtube_channel::Model) -> Self {
        Self {
            id: model.id,
            external_id: model.youtube_channel_id.clone(),
        }
    }
}

/// Channels that are not soft-deleted, oldest first.
pub async fn list_active_channels(db: &DatabaseConnection) -> Result<Vec<youtube_channel::Model>> {
    Ok(youtube_channel::Entity::find()
        .filter(youtube_channel::Column::DeletedAt.is_null())
        .order_by_asc(youtube_channel::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn find_channel(
    db: &DatabaseConnection,
    external_id: &str,
) -> Result<Option<youtube_channel::Model>> {
    Ok(youtube_channel::Entity::find()
        .filter(youtube_channel::Column::YoutubeChannelId.eq(external_id))
        .one(db)
        .await?)
}

/// Start tracking a channel, or revive a previously untracked one.
pub async fn track_channel(
    db: &DatabaseConnection,
    external_id: &str,
) -> Result<youtube_channel::Model> {
    let external_id = external_id.trim();
    if external_id.is_empty() {
        return Err(PersistenceError::invalid_input("channel id must not be empty"));
    }

    let now = Utc::now().fixed_offset();
    let model = youtube_channel::ActiveModel {
        id: Set(Uuid::new_v4()),
        youtube_channel_id: Set(external_id.to_string()),
        name: Set(None),
        youtube_handle: Set(None),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    youtube_channel::Entity::insert(model)
        .on_conflict(
            OnConflict::column(youtube_channel::Column::YoutubeChannelId)
                .update_columns([
                    youtube_channel::Column::DeletedAt,
                    youtube_channel::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_channel(db, external_id)
        .await?
        .ok_or_else(|| PersistenceError::NotFound {
            context: format!("channel {external_id}"),
        })
}

/// Stop syncing a channel. Its videos are kept.
///
/// Returns `false` when the channel was not tracked.
pub async fn untrack_channel(db: &DatabaseConnection, external_id: &str) -> Result<bool> {
    let now = Utc::now().fixed_offset();
    let result = youtube_channel::Entity::update_many()
        .col_expr(
            youtube_channel::Column::DeletedAt,
            sea_orm::sea_query::Expr::value(now),
        )
        .col_expr(
            youtube_channel::Column::UpdatedAt,
            sea_orm::sea_query::Expr::value(now),
        )
        .filter(youtube_channel::Column::YoutubeChannelId.eq(external_id))
        .filter(youtube_channel::Column::DeletedAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Copy remote title and handle onto the channel row when they differ.
///
/// Returns whether a write happened.
pub async fn update_channel_metadata(
    db: &DatabaseConnection,
    channel: &youtube_channel::Model,
    remote: &RemoteChannel,
) -> Result<bool> {
    let name_changed = remote.title.is_some() && remote.title != channel.name;
    let handle_changed = remote.custom_url.is_some() && remote.custom_url != channel.youtube_handle;
    if !name_changed && !handle_changed {
        return Ok(false);
    }

    let mut active = channel.clone().into_active_model();
    if name_changed {
        active.name = Set(remote.title.clone());
    }
    if handle_changed {
        active.youtube_handle = Set(remote.custom_url.clone());
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(db).await?;

    tracing::debug!(channel = %channel.youtube_channel_id, "channel metadata refreshed");
    Ok(true)
}
