//! Pagination module
//!
//! Cursor-paginated collection of a target number of items.
//!
//! # Overview
//!
//! A [`PaginationDriver`] repeatedly asks a [`BatchFetcher`] for at most
//! `page_cap` items after the current cursor. Each call is wrapped in the
//! rate limit handler, progress is pushed to an optional [`ProgressSink`],
//! and the pacing model spaces consecutive batches. The run ends when the
//! target is reached, the source runs dry, the cursor repeats, or a terminal
//! error or cancellation stops it early.

mod driver;
mod types;

pub use driver::PaginationDriver;
pub use types::{
    BatchFetcher, FetchOutcome, FetchResult, PaginationState, Progress, ProgressSink, RunStatus,
    PER_PAGE_CAP,
};
