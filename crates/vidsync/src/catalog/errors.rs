use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures reported by a [`RemoteCatalog`](super::RemoteCatalog).
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog rejected the request itself; retrying will not help.
    #[error("catalog rejected request: {message}")]
    Api { message: String },

    #[error("catalog server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Daily quota or per-second limit hit.
    #[error("catalog rate limited until {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Missing or invalid API key.
    #[error("catalog credentials missing or rejected")]
    AuthRequired,

    #[error("{resource} not found in catalog")]
    NotFound { resource: String },

    #[error("catalog unreachable: {message}")]
    Network { message: String },

    /// Payload that could not be decoded, or a misconfigured client.
    #[error("catalog client error: {message}")]
    Internal { message: String },
}

impl CatalogError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Server errors, network failures and rate limits. A retry of the same
    /// request may succeed; for every other variant it will not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Server { .. } | Self::Network { .. } | Self::RateLimited { .. }
        )
    }
}

/// First line of an error message, for progress output and run reports.
pub fn short_error_message(e: &impl std::error::Error) -> String {
    e.to_string().lines().next().unwrap_or_default().to_string()
}

pub type Result<T> = std::result::Result<T, CatalogError>;
