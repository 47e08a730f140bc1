//! Backoff for transient catalog failures.
//!
//! Network errors, rate limiting and 5xx responses are retried with jittered
//! exponential backoff; everything else fails on the first attempt.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::catalog::{self, CatalogError, short_error_message};
use crate::sync::{ProgressCallback, SyncProgress};

/// Total attempts per catalog request, the first one included.
pub const CATALOG_ATTEMPTS: usize = 3;

/// Delay before the first retry. Doubles per retry.
pub const FIRST_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Cap on any single delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// The backoff schedule shared by every catalog request.
#[must_use]
pub fn catalog_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(FIRST_RETRY_DELAY)
        .with_max_delay(MAX_RETRY_DELAY)
        .with_max_times(CATALOG_ATTEMPTS - 1)
        .with_jitter()
}

/// Run one catalog request, retrying while [`CatalogError::is_transient`].
///
/// Retries are logged at debug level and, given a callback, reported as
/// [`SyncProgress::RetryBackoff`] under `label`.
pub async fn retry_catalog<T, F, Fut>(
    label: &str,
    on_progress: Option<&ProgressCallback>,
    mut request: F,
) -> catalog::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = catalog::Result<T>>,
{
    let attempts = AtomicU32::new(0);

    let attempt = || {
        attempts.fetch_add(1, Ordering::Relaxed);
        request()
    };

    attempt
        .retry(catalog_backoff())
        .when(CatalogError::is_transient)
        .notify(|err: &CatalogError, delay: Duration| {
            let attempt = attempts.load(Ordering::Relaxed);
            tracing::debug!(
                request = label,
                attempt,
                ?delay,
                error = %short_error_message(err),
                "transient catalog failure, retrying"
            );
            if let Some(cb) = on_progress {
                cb(SyncProgress::RetryBackoff {
                    operation: label.to_string(),
                    retry_after_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                });
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn counting_callback() -> (ProgressCallback, Arc<Mutex<Vec<SyncProgress>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            sink.lock().unwrap().push(event);
        });
        (callback, events)
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_are_retried_until_success() {
        let calls = &AtomicU32::new(0);
        let (callback, events) = counting_callback();

        let result = retry_catalog("videos.list", Some(&callback), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(CatalogError::Server {
                    status: 503,
                    message: "backend error".to_string(),
                })
            } else {
                Ok(7u32)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            SyncProgress::RetryBackoff { operation, attempt: 1, .. } if operation == "videos.list"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_last_attempt() {
        let calls = &AtomicU32::new(0);

        let err = retry_catalog("playlistItems.list", None, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(CatalogError::network("connection reset"))
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("connection reset"));
        assert_eq!(calls.load(Ordering::SeqCst), CATALOG_ATTEMPTS as u32);
    }

    #[tokio::test]
    async fn auth_failures_are_not_retried() {
        let calls = &AtomicU32::new(0);

        let err = retry_catalog("channels.list", None, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(CatalogError::AuthRequired)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CatalogError::AuthRequired));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
