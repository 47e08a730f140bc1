//! Lifecycle status of a video.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Broadcast lifecycle, always derived from live-streaming timestamps.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum VideoStatus {
    #[sea_orm(string_value = "UPCOMING")]
    Upcoming,
    #[sea_orm(string_value = "LIVE")]
    Live,
    #[sea_orm(string_value = "ENDED")]
    #[default]
    Ended,
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoStatus::Upcoming => write!(f, "UPCOMING"),
            VideoStatus::Live => write!(f, "LIVE"),
            VideoStatus::Ended => write!(f, "ENDED"),
        }
    }
}
