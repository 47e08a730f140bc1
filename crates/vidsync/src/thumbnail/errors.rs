use thiserror::Error;

use crate::catalog::CatalogError;

use super::blob::BlobError;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The image host answered with something other than 2xx or 304.
    #[error("thumbnail fetch failed with HTTP {status}")]
    Fetch { status: u16 },

    /// The remote record has no usable thumbnail rendition.
    #[error("no thumbnail with url and dimensions for {external_id}")]
    MissingThumbnail { external_id: String },

    #[error("thumbnail transport error: {0}")]
    Transport(String),

    #[error("could not decode thumbnail: {0}")]
    Decode(String),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("thumbnail task failed: {0}")]
    Task(String),
}

impl ThumbnailError {
    /// Data errors come from the record itself and will not clear on retry.
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::MissingThumbnail { .. } | Self::Decode(_))
    }
}

impl From<ThumbnailError> for CatalogError {
    fn from(err: ThumbnailError) -> Self {
        match err {
            ThumbnailError::Fetch { status } if status >= 500 => CatalogError::Server {
                status,
                message: err.to_string(),
            },
            ThumbnailError::Fetch { status: 404 } => CatalogError::not_found(err.to_string()),
            ThumbnailError::Transport(message) => CatalogError::network(message),
            other => CatalogError::internal(other.to_string()),
        }
    }
}
