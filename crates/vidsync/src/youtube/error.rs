//! Error types for YouTube Data API calls.

use chrono::{Duration, Utc};
use thiserror::Error;

use super::types::ErrorEnvelope;
use crate::catalog::CatalogError;

/// Reasons YouTube reports when a quota or rate limit is hit.
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "rateLimitExceeded", "userRateLimitExceeded"];

#[derive(Debug, Error)]
pub enum YouTubeError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        reason: Option<String>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl YouTubeError {
    /// Build an API error from a non-2xx response body.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(envelope) => YouTubeError::Api {
                status,
                message: envelope.error.message,
                reason: envelope.error.errors.into_iter().find_map(|e| e.reason),
            },
            Err(_) => YouTubeError::Api {
                status,
                message: String::from_utf8_lossy(body).trim().to_string(),
                reason: None,
            },
        }
    }

    fn is_quota(&self) -> bool {
        matches!(
            self,
            YouTubeError::Api { reason: Some(r), .. } if QUOTA_REASONS.contains(&r.as_str())
        )
    }
}

impl From<YouTubeError> for CatalogError {
    fn from(err: YouTubeError) -> Self {
        if err.is_quota() {
            return CatalogError::RateLimited {
                reset_at: Utc::now() + Duration::hours(1),
            };
        }
        match err {
            YouTubeError::Http(message) => CatalogError::Network { message },
            YouTubeError::Json(e) => CatalogError::Internal {
                message: format!("JSON parse error: {e}"),
            },
            YouTubeError::Api {
                status, message, ..
            } => match status {
                401 | 403 => CatalogError::AuthRequired,
                404 => CatalogError::NotFound { resource: message },
                429 => CatalogError::RateLimited {
                    reset_at: Utc::now() + Duration::minutes(1),
                },
                500..=599 => CatalogError::Server { status, message },
                _ => CatalogError::Api { message },
            },
            YouTubeError::Config(message) => CatalogError::Internal { message },
        }
    }
}

/// Short message for progress output.
pub fn short_error_message(err: &YouTubeError) -> String {
    match err {
        YouTubeError::Http(_) => "Network error".to_string(),
        YouTubeError::Json(_) => "JSON parse error".to_string(),
        YouTubeError::Api {
            status,
            reason: Some(reason),
            ..
        } => format!("HTTP {status}: {reason}"),
        YouTubeError::Api {
            status, message, ..
        } => {
            if message.chars().count() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {status}: {truncated}...")
            } else {
                format!("HTTP {status}: {message}")
            }
        }
        YouTubeError::Config(msg) => format!("Config: {msg}"),
    }
}
