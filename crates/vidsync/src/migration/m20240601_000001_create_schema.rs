//! Initial schema: channels, thumbnails, videos and the video id link table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_youtube_channels(manager).await?;
        self.create_thumbnails(manager).await?;
        self.create_videos(manager).await?;
        self.create_youtube_videos(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(YoutubeVideos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Videos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Thumbnails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(YoutubeChannels::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn timestamp_now<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

impl Migration {
    async fn create_youtube_channels(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(YoutubeChannels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(YoutubeChannels::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(YoutubeChannels::YoutubeChannelId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(YoutubeChannels::Name).string().null())
                    .col(ColumnDef::new(YoutubeChannels::YoutubeHandle).string().null())
                    .col(
                        ColumnDef::new(YoutubeChannels::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_now(YoutubeChannels::CreatedAt))
                    .col(timestamp_now(YoutubeChannels::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_youtube_channels_channel_id")
                    .table(YoutubeChannels::Table)
                    .col(YoutubeChannels::YoutubeChannelId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn create_thumbnails(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Thumbnails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Thumbnails::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Thumbnails::Path).string().not_null())
                    .col(ColumnDef::new(Thumbnails::Width).integer().not_null())
                    .col(ColumnDef::new(Thumbnails::Height).integer().not_null())
                    .col(ColumnDef::new(Thumbnails::BlurDataUrl).text().not_null())
                    .col(ColumnDef::new(Thumbnails::Etag).text().null())
                    .col(
                        ColumnDef::new(Thumbnails::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_now(Thumbnails::CreatedAt))
                    .col(timestamp_now(Thumbnails::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_videos(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Videos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Videos::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Videos::ChannelId).uuid().not_null())
                    // Content
                    .col(ColumnDef::new(Videos::Title).text().not_null())
                    .col(
                        ColumnDef::new(Videos::Duration)
                            .string_len(32)
                            .not_null()
                            .default("P0D"),
                    )
                    .col(
                        ColumnDef::new(Videos::PublishedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Videos::Status)
                            .string_len(16)
                            .not_null()
                            .default("ENDED"),
                    )
                    .col(
                        ColumnDef::new(Videos::Kind)
                            .string_len(16)
                            .not_null()
                            .default("standard"),
                    )
                    // Presentation
                    .col(
                        ColumnDef::new(Videos::Visible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Videos::ThumbnailId).uuid().null())
                    // Timestamps
                    .col(
                        ColumnDef::new(Videos::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_now(Videos::CreatedAt))
                    .col(timestamp_now(Videos::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_videos_channel")
                            .from(Videos::Table, Videos::ChannelId)
                            .to(YoutubeChannels::Table, YoutubeChannels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_videos_thumbnail")
                            .from(Videos::Table, Videos::ThumbnailId)
                            .to(Thumbnails::Table, Thumbnails::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Tracked-video listing for check runs
        manager
            .create_index(
                Index::create()
                    .name("idx_videos_deleted_published")
                    .table(Videos::Table)
                    .col(Videos::DeletedAt)
                    .col((Videos::PublishedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_videos_channel_id")
                    .table(Videos::Table)
                    .col(Videos::ChannelId)
                    .to_owned(),
            )
            .await
    }

    async fn create_youtube_videos(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(YoutubeVideos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(YoutubeVideos::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(YoutubeVideos::VideoId).uuid().not_null())
                    .col(
                        ColumnDef::new(YoutubeVideos::YoutubeVideoId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(YoutubeVideos::YoutubeChannelId)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_youtube_videos_video")
                            .from(YoutubeVideos::Table, YoutubeVideos::VideoId)
                            .to(Videos::Table, Videos::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One link per video
        manager
            .create_index(
                Index::create()
                    .name("idx_youtube_videos_video_id")
                    .table(YoutubeVideos::Table)
                    .col(YoutubeVideos::VideoId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // At most one video per remote id
        manager
            .create_index(
                Index::create()
                    .name("idx_youtube_videos_youtube_video_id")
                    .table(YoutubeVideos::Table)
                    .col(YoutubeVideos::YoutubeVideoId)
                    .unique()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum YoutubeChannels {
    Table,
    Id,
    YoutubeChannelId,
    Name,
    YoutubeHandle,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Thumbnails {
    Table,
    Id,
    Path,
    Width,
    Height,
    BlurDataUrl,
    Etag,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Videos {
    Table,
    Id,
    ChannelId,
    Title,
    Duration,
    PublishedAt,
    Status,
    Kind,
    Visible,
    ThumbnailId,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum YoutubeVideos {
    Table,
    Id,
    VideoId,
    YoutubeVideoId,
    YoutubeChannelId,
}
