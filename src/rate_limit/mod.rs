//! Rate limit handling module
//!
//! Wraps a single remote call with retries, backoff, server reset-time
//! awareness, transparent reauthentication, and a preemptive self-throttle.
//!
//! # Features
//!
//! - **Backoff Policy**: Pure exponential/linear/constant backoff with additive jitter
//! - **Reset Awareness**: Honors the server's advertised reset instant
//! - **Reauthentication**: Logs in again on expired sessions and retries the call
//! - **Preemptive Throttle**: Slows down on high recent request volume
//! - **Request Quota**: Optional hard requests-per-minute ceiling using governor

pub mod backoff;
mod handler;
mod quota;
mod types;

pub use backoff::{compute_backoff, long_pause, server_reset_wait};
pub use handler::{Authenticate, RateLimitHandler};
pub use quota::RequestQuota;
pub use types::{RateLimitConfig, RequestWindow};
