//! Common re-exports for convenient entity usage.

pub use super::thumbnail::{
    ActiveModel as ThumbnailActiveModel, Column as ThumbnailColumn, Entity as Thumbnail,
    Model as ThumbnailModel,
};
pub use super::video::{
    ActiveModel as VideoActiveModel, Column as VideoColumn, Entity as Video, Model as VideoModel,
};
pub use super::video_kind::VideoKind;
pub use super::video_status::VideoStatus;
pub use super::youtube_channel::{
    ActiveModel as YoutubeChannelActiveModel, Column as YoutubeChannelColumn,
    Entity as YoutubeChannel, Model as YoutubeChannelModel,
};
pub use super::youtube_video::{
    ActiveModel as YoutubeVideoActiveModel, Column as YoutubeVideoColumn,
    Entity as YoutubeVideo, Model as YoutubeVideoModel,
};
