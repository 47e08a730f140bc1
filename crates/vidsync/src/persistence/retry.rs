use std::future::Future;
use std::time::Duration;

use super::errors::{PersistenceError, Result};

/// Default number of retries for a failed write.
pub const DEFAULT_WRITE_RETRIES: u32 = 2;

/// Initial backoff in milliseconds; doubles on each retry.
pub const DEFAULT_WRITE_BACKOFF_MS: u64 = 100;

/// Run a database write, retrying transient failures with doubling backoff.
pub(crate) async fn retry_write<T, F, Fut>(label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff_ms = DEFAULT_WRITE_BACKOFF_MS;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < DEFAULT_WRITE_RETRIES => {
                attempt += 1;
                tracing::warn!(
                    operation = label,
                    attempt,
                    backoff_ms,
                    error = %e,
                    "write failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Collapse a retried write into its error message for run reports.
pub(crate) fn describe(e: &PersistenceError) -> String {
    crate::catalog::short_error_message(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbErr, RuntimeErr};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn locked() -> PersistenceError {
        PersistenceError::Database(DbErr::Exec(RuntimeErr::Internal(
            "database is locked".to_string(),
        )))
    }

    #[tokio::test(start_paused = true)]
    async fn retries_locked_database_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_write("videos.update", move || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(locked())
                } else {
                    Ok(5)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_retry_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let err = retry_write("videos.insert", move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(locked())
            }
        })
        .await
        .expect_err("should give up");
        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_WRITE_RETRIES + 1);
    }

    #[tokio::test]
    async fn constraint_violations_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let err = retry_write("links.insert", move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(PersistenceError::Database(DbErr::Exec(RuntimeErr::Internal(
                    "UNIQUE constraint failed: youtube_videos.youtube_video_id".to_string(),
                ))))
            }
        })
        .await
        .expect_err("constraint error");
        assert!(!err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
