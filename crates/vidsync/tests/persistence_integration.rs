//! Channel tracking and stored-view queries against a migrated SQLite database.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use uuid::Uuid;
use vidsync::catalog::RemoteChannel;
use vidsync::entity::video_kind::VideoKind;
use vidsync::entity::video_status::VideoStatus;
use vidsync::entity::{thumbnail, video};
use vidsync::persistence::{
    TrackedScope, find_channel, list_active_channels, load_saved_videos,
    load_tracked_external_ids, soft_delete_orphaned_thumbnails, track_channel, untrack_channel,
    update_channel_metadata,
};
use vidsync::{YoutubeChannel, connect_and_migrate};

async fn setup_test_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

#[tokio::test]
async fn tracking_is_idempotent() {
    let db = setup_test_db().await;

    let first = track_channel(&db, "UC1").await.unwrap();
    let second = track_channel(&db, " UC1 ").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(YoutubeChannel::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn blank_channel_id_is_rejected() {
    let db = setup_test_db().await;
    assert!(track_channel(&db, "   ").await.is_err());
}

#[tokio::test]
async fn untrack_then_retrack_revives_the_row() {
    let db = setup_test_db().await;
    let original = track_channel(&db, "UC1").await.unwrap();
    track_channel(&db, "UC2").await.unwrap();

    assert!(untrack_channel(&db, "UC1").await.unwrap());
    assert!(!untrack_channel(&db, "UC1").await.unwrap());
    assert!(!untrack_channel(&db, "UC_unknown").await.unwrap());

    let active = list_active_channels(&db).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].youtube_channel_id, "UC2");

    let stored = find_channel(&db, "UC1").await.unwrap().expect("row kept");
    assert!(stored.deleted_at.is_some());

    let revived = track_channel(&db, "UC1").await.unwrap();
    assert_eq!(revived.id, original.id);
    assert!(revived.deleted_at.is_none());
    assert_eq!(list_active_channels(&db).await.unwrap().len(), 2);
}

#[tokio::test]
async fn metadata_is_written_only_when_it_changes() {
    let db = setup_test_db().await;
    let channel = track_channel(&db, "UC1").await.unwrap();
    let remote = RemoteChannel {
        external_id: "UC1".to_string(),
        uploads_playlist_id: "UU1".to_string(),
        title: Some("Channel One".to_string()),
        custom_url: Some("@one".to_string()),
    };

    assert!(update_channel_metadata(&db, &channel, &remote).await.unwrap());

    let refreshed = find_channel(&db, "UC1").await.unwrap().unwrap();
    assert_eq!(refreshed.name.as_deref(), Some("Channel One"));
    assert_eq!(refreshed.youtube_handle.as_deref(), Some("@one"));
    assert!(!update_channel_metadata(&db, &refreshed, &remote).await.unwrap());
}

#[tokio::test]
async fn empty_database_has_nothing_tracked() {
    let db = setup_test_db().await;

    for scope in [TrackedScope::Recent, TrackedScope::All] {
        assert!(load_tracked_external_ids(&db, scope).await.unwrap().is_empty());
    }
    let saved = load_saved_videos(&db, &["v1".to_string()]).await.unwrap();
    assert!(saved.is_empty());
    assert!(
        soft_delete_orphaned_thumbnails(&db, Utc::now())
            .await
            .unwrap()
            .is_empty()
    );
}

async fn insert_thumbnail(db: &DatabaseConnection) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now().fixed_offset();
    thumbnail::ActiveModel {
        id: Set(id),
        path: Set(format!("v/{id}.jpg")),
        width: Set(1280),
        height: Set(720),
        blur_data_url: Set("data:image/jpeg;base64,AA==".to_string()),
        etag: Set(Some("\"e1\"".to_string())),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert thumbnail");
    id
}

async fn insert_video(
    db: &DatabaseConnection,
    channel_id: Uuid,
    thumbnail_id: Uuid,
    deleted: bool,
) {
    let now = Utc::now().fixed_offset();
    video::ActiveModel {
        id: Set(Uuid::new_v4()),
        channel_id: Set(channel_id),
        title: Set("A video".to_string()),
        duration: Set("PT1M".to_string()),
        published_at: Set(now),
        status: Set(VideoStatus::Ended),
        kind: Set(VideoKind::Standard),
        visible: Set(true),
        thumbnail_id: Set(Some(thumbnail_id)),
        deleted_at: Set(deleted.then_some(now)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert video");
}

#[tokio::test]
async fn sweep_removes_thumbnails_without_a_live_video() {
    let db = setup_test_db().await;
    let channel = track_channel(&db, "UC1").await.unwrap();

    let unreferenced = insert_thumbnail(&db).await;
    let of_deleted_video = insert_thumbnail(&db).await;
    let of_live_video = insert_thumbnail(&db).await;
    insert_video(&db, channel.id, of_deleted_video, true).await;
    insert_video(&db, channel.id, of_live_video, false).await;

    let mut swept = soft_delete_orphaned_thumbnails(&db, Utc::now())
        .await
        .unwrap();
    swept.sort();
    let mut expected = vec![unreferenced, of_deleted_video];
    expected.sort();
    assert_eq!(swept, expected);

    let kept = thumbnail::Entity::find_by_id(of_live_video)
        .one(&db)
        .await
        .unwrap()
        .expect("thumbnail row");
    assert!(kept.deleted_at.is_none());
    let gone = thumbnail::Entity::find_by_id(unreferenced)
        .one(&db)
        .await
        .unwrap()
        .expect("thumbnail row");
    assert!(gone.deleted_at.is_some());

    assert!(
        soft_delete_orphaned_thumbnails(&db, Utc::now())
            .await
            .unwrap()
            .is_empty()
    );
}
