//! Rate limit configuration and request window

use crate::error::{Error, Result};
use crate::types::{secs, BackoffType};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// How far back the request window looks
pub const THROTTLE_WINDOW: Duration = Duration::from_secs(900);

/// Window size above which calls are preemptively delayed
pub const THROTTLE_THRESHOLD: usize = 100;

/// Preemptive delay per request in the window, in seconds
pub const THROTTLE_SECS_PER_REQUEST: f64 = 0.2;

/// Upper bound on the preemptive delay, in seconds
pub const THROTTLE_MAX_SECS: f64 = 5.0;

/// Safety margin added to a server-advertised reset instant, in seconds
pub const RESET_BUFFER_SECS: f64 = 5.0;

/// Configuration for rate limit handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial backoff delay in seconds
    pub base_delay: f64,
    /// Upper bound for any single wait in seconds
    pub max_delay: f64,
    /// Growth factor for exponential backoff
    pub backoff_multiplier: f64,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Add up to 10% random jitter to backoff delays
    pub jitter: bool,
    /// Wait for the server's advertised reset instant when present
    pub respect_reset_time: bool,
    /// Optional hard ceiling on requests per minute
    pub requests_per_minute: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: 1.0,
            max_delay: 300.0,
            backoff_multiplier: 2.0,
            backoff_type: BackoffType::Exponential,
            jitter: true,
            respect_reset_time: true,
            requests_per_minute: None,
        }
    }
}

impl RateLimitConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max retries
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set base and max delay in seconds
    #[must_use]
    pub fn with_delays(mut self, base_delay: f64, max_delay: f64) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Set backoff strategy and multiplier
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, multiplier: f64) -> Self {
        self.backoff_type = backoff_type;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Enable or disable honoring the server reset time
    #[must_use]
    pub fn with_respect_reset_time(mut self, respect: bool) -> Self {
        self.respect_reset_time = respect;
        self
    }

    /// Set a hard requests-per-minute ceiling
    #[must_use]
    pub fn with_requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = Some(rpm);
        self
    }

    /// Upper bound for any single wait
    pub fn max_delay_duration(&self) -> Duration {
        secs(self.max_delay)
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<()> {
        if !self.base_delay.is_finite() || self.base_delay <= 0.0 {
            return Err(Error::invalid_value(
                "rate_limit.base_delay",
                format!("must be a positive number, got {}", self.base_delay),
            ));
        }
        if !self.max_delay.is_finite() || self.max_delay < self.base_delay {
            return Err(Error::invalid_value(
                "rate_limit.max_delay",
                format!(
                    "must be >= base_delay ({}), got {}",
                    self.base_delay, self.max_delay
                ),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 1.0 {
            return Err(Error::invalid_value(
                "rate_limit.backoff_multiplier",
                format!("must be > 1, got {}", self.backoff_multiplier),
            ));
        }
        if self.requests_per_minute == Some(0) {
            return Err(Error::invalid_value(
                "rate_limit.requests_per_minute",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

/// Sliding window of recent successful request instants
#[derive(Debug, Clone, Default)]
pub struct RequestWindow {
    times: VecDeque<Instant>,
}

impl RequestWindow {
    /// Create an empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful request at `now`
    pub fn record(&mut self, now: Instant) {
        self.times.push_back(now);
    }

    /// Drop entries older than the throttle window
    pub fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.times.front() {
            if now.saturating_duration_since(*oldest) >= THROTTLE_WINDOW {
                self.times.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of requests currently in the window
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Preemptive delay owed for the current window size, if any
    pub fn throttle_delay(&self) -> Option<Duration> {
        let count = self.times.len();
        if count > THROTTLE_THRESHOLD {
            let delay = (count as f64 * THROTTLE_SECS_PER_REQUEST).min(THROTTLE_MAX_SECS);
            Some(secs(delay))
        } else {
            None
        }
    }
}
