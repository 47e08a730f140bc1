//! SeaORM entity definitions for the vidsync schema.

pub mod prelude;
pub mod thumbnail;
pub mod video;
pub mod video_kind;
pub mod video_status;
pub mod youtube_channel;
pub mod youtube_video;
