//! Hard request quota
//!
//! Uses the governor crate for a token bucket that spaces requests evenly
//! across a minute. This is a ceiling on top of the sliding-window throttle.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Token bucket limiting requests per minute
#[derive(Clone)]
pub struct RequestQuota {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    per_minute: NonZeroU32,
}

impl RequestQuota {
    /// Create a quota of `per_minute` requests. Zero is raised to one.
    pub fn per_minute(per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(Governor::direct(Quota::per_minute(per_minute))),
            per_minute,
        }
    }

    /// Configured requests per minute
    pub fn limit(&self) -> u32 {
        self.per_minute.get()
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RequestQuota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQuota")
            .field("per_minute", &self.per_minute)
            .finish()
    }
}

#[cfg(test)]
mod quota_tests {
    use super::*;

    #[test]
    fn test_quota_zero_is_raised() {
        let quota = RequestQuota::per_minute(0);
        assert_eq!(quota.limit(), 1);
    }

    #[test]
    fn test_quota_allows_burst_up_to_limit() {
        let quota = RequestQuota::per_minute(5);
        for _ in 0..5 {
            assert!(quota.try_acquire());
        }
        assert!(!quota.try_acquire());
    }

    #[tokio::test]
    async fn test_quota_wait_within_burst() {
        let quota = RequestQuota::per_minute(60);
        quota.wait().await;
    }
}
