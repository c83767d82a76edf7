//! Rate-limited fetcher wrapper.
//!
//! Wraps any `PageFetcher` with a governor quota.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::traits::fetcher::PageFetcher;
use crate::types::page::PageContent;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A fetcher wrapper that waits for a permit before every fetch.
pub struct RateLimitedFetcher<F: PageFetcher> {
    inner: F,
    limiter: Arc<DefaultRateLimiter>,
}

impl<F: PageFetcher> RateLimitedFetcher<F> {
    /// Limit to `requests_per_second`, with bursts up to that rate.
    /// Zero is treated as one.
    pub fn new(fetcher: F, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self::with_quota(fetcher, Quota::per_second(rate))
    }

    pub fn with_quota(fetcher: F, quota: Quota) -> Self {
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent> {
        self.limiter.until_ready().await;
        self.inner.fetch(url).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::time::Instant;

    #[tokio::test]
    async fn test_passes_through_and_limits() {
        let mock = MockFetcher::new().with_page("https://a.example", "content");
        let quota = Quota::per_second(nonzero!(10u32)).allow_burst(nonzero!(1u32));
        let fetcher = RateLimitedFetcher::with_quota(mock.clone(), quota);

        let start = Instant::now();
        for _ in 0..3 {
            assert!(fetcher.fetch("https://a.example").await.is_ok());
        }

        // First permit is immediate, the next two wait ~100ms each
        assert!(start.elapsed().as_millis() >= 150);
        assert_eq!(mock.call_count(), 3);
        assert_eq!(fetcher.name(), "mock");
    }
}
