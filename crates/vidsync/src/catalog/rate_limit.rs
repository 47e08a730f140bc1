use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default request pacing.
pub mod rate_limits {
    /// YouTube Data API: quota is unit-based, 10/sec keeps bursts polite.
    pub const YOUTUBE_DEFAULT_RPS: u32 = 10;
    /// Spacing between thumbnail task starts, in milliseconds.
    pub const THUMBNAIL_SPACING_MS: u64 = 250;
}

/// Shared pacing gate backed by `governor`.
///
/// Clones share the same budget, so one limiter can pace every task of a
/// worker pool.
///
/// ```ignore
/// let limiter = ApiRateLimiter::new(10);
/// limiter.wait().await;
/// catalog.fetch_video_batch(&ids).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Allow `requests_per_second` requests per second. Zero is treated as one.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Allow one request per `interval`, with no burst.
    ///
    /// Returns `None` for a zero interval, meaning "no spacing".
    pub fn spaced(interval: Duration) -> Option<Self> {
        let quota = Quota::with_period(interval)?.allow_burst(NonZeroU32::MIN);
        Some(Self {
            inner: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Wait (asynchronously) until another request may proceed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}
