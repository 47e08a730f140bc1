use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Format of a video: regular upload or vertical short.
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
pub enum VideoKind {
    #[sea_orm(string_value = "standard")]
    #[default]
    Standard,
    #[sea_orm(string_value = "short")]
    Short,
}

impl std::fmt::Display for VideoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoKind::Standard => write!(f, "standard"),
            VideoKind::Short => write!(f, "short"),
        }
    }
}
