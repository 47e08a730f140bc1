use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("no stored row for {context}")]
    NotFound { context: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Some rows of a batch were written and some were not.
    #[error("batch write incomplete: {succeeded} succeeded, {failed} failed")]
    PartialFailure { succeeded: usize, failed: usize },
}

impl PersistenceError {
    pub fn not_found_by_id(id: Uuid) -> Self {
        Self::NotFound {
            context: format!("id={id}"),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Lock contention and dropped connections clear on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(err) if is_retryable_db_error(err))
    }
}

/// Lowercase fragments of SQLite busy/locked errors and Postgres connection
/// errors.
const TRANSIENT_DB_MARKERS: [&str; 5] = [
    "locked",
    "busy",
    "timeout",
    "connection",
    "temporarily unavailable",
];

fn is_retryable_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let text = err.to_string().to_lowercase();
            TRANSIENT_DB_MARKERS.iter().any(|m| text.contains(m))
        }
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
