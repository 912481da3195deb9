// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # feedpace
//!
//! Rate-adaptive, human-paced paginated fetching for rate-limited feed APIs.
//!
//! ## Features
//!
//! - **Retry Handling**: Exponential, linear, or constant backoff with jitter
//! - **Reset Awareness**: Waits for the server's advertised rate limit reset
//! - **Reauthentication**: Logs in again when a session expires mid-run
//! - **Human Pacing**: Log-normal pauses between batches and periodic long breaks
//! - **Partial Results**: Keeps what was collected when a run fails midway
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use feedpace::feed::FeedScraper;
//! use feedpace::http::{HttpFeedSource, SourceConfig};
//!
//! #[tokio::main]
//! async fn main() -> feedpace::Result<()> {
//!     let source = HttpFeedSource::new(SourceConfig::new("https://feed.example.com/api"))?;
//!     let scraper = FeedScraper::builder(source).build()?;
//!
//!     let outcome = scraper.fetch_timeline("42", 100, None).await?;
//!     println!("{} items ({})", outcome.len(), outcome.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │          FeedScraper: fetch_timeline() / search()         │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┴──────────────────────────────┐
//! │        PaginationDriver: cursor loop, target, status      │
//! └───────────────────────────────────────────────────────────┘
//!               │                              │
//! ┌─────────────┴─────────────┐  ┌─────────────┴─────────────┐
//! │ RateLimitHandler          │  │ PacingModel               │
//! │ retries, backoff, reset,  │  │ short pauses, long breaks │
//! │ reauth, self-throttle     │  │                           │
//! └───────────────────────────┘  └───────────────────────────┘
//!               │
//! ┌─────────────┴─────────────┐
//! │ FeedSource (HttpFeedSource│
//! │ + SessionAuthenticator)   │
//! └───────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and helpers
pub mod types;

/// Cooperative cancellation
pub mod cancel;

/// Retry, backoff, and reauthentication around single calls
pub mod rate_limit;

/// Human-like delays between batches
pub mod pacing;

/// Cursor pagination driver
pub mod pagination;

/// Session login
pub mod auth;

/// HTTP feed source
pub mod http;

/// Timeline and search operations
pub mod feed;

/// YAML run configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use cancel::CancelToken;
pub use config::{load_config, FetchConfig};
pub use error::{CallError, Error, Result};
pub use feed::{FeedScraper, FeedSource, FeedUser, SearchMode, SearchParameters, UserRef};
pub use pacing::{HumanPacing, NoPacing, PacingConfig, PacingModel};
pub use pagination::{FetchOutcome, FetchResult, PaginationDriver, RunStatus};
pub use rate_limit::{Authenticate, RateLimitConfig, RateLimitHandler};
pub use types::BackoffType;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
