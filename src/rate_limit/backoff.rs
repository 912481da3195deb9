//! Backoff policy
//!
//! Pure functions that turn a retry count (and a random source) into a wait.
//! Jitter only ever adds to a delay so the computed wait never undershoots.

use super::types::{RateLimitConfig, RESET_BUFFER_SECS};
use crate::types::{secs, BackoffType};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;

/// Maximum jitter as a fraction of the computed delay
pub const JITTER_FRACTION: f64 = 0.1;

/// Bounds of the extra pause added after repeated rate limits, in seconds
pub const LONG_PAUSE_SECS: (f64, f64) = (20.0, 60.0);

/// Compute the backoff for a 1-based retry count.
///
/// `retry_count` 0 is treated as 1.
pub fn compute_backoff<R: Rng + ?Sized>(
    retry_count: u32,
    config: &RateLimitConfig,
    rng: &mut R,
) -> Duration {
    let retry = retry_count.max(1);
    let raw = match config.backoff_type {
        BackoffType::Constant => config.base_delay,
        BackoffType::Linear => config.base_delay * f64::from(retry),
        BackoffType::Exponential => {
            let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
            config.base_delay * config.backoff_multiplier.powi(exponent)
        }
    };

    // powi overflows to infinity for large exponents; the cap absorbs it
    let mut delay = raw.min(config.max_delay);
    if !delay.is_finite() {
        delay = config.max_delay;
    }

    if config.jitter {
        delay += delay * JITTER_FRACTION * rng.random::<f64>();
    }

    secs(delay)
}

/// Wait until the server's reset instant plus a safety buffer, capped at `max_delay`
pub fn server_reset_wait(
    reset: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &RateLimitConfig,
) -> Duration {
    let until_reset = (reset - now).to_std().unwrap_or(Duration::ZERO);
    (until_reset + secs(RESET_BUFFER_SECS)).min(config.max_delay_duration())
}

/// Extra pause for callers that keep hitting the limit
pub fn long_pause<R: Rng + ?Sized>(rng: &mut R) -> Duration {
    let (low, high) = LONG_PAUSE_SECS;
    secs(rng.random_range(low..high))
}
