//! Pagination types and traits
//!
//! Defines the batch fetch seam, per-run state, progress reporting, and the
//! outcome of a run.

use crate::error::CallError;
use async_trait::async_trait;
use std::future::Future;

/// Largest batch a single call may request
pub const PER_PAGE_CAP: usize = 20;

// ============================================================================
// Fetch Result
// ============================================================================

/// One batch returned by a fetch call
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<T> {
    /// Items in fetch order
    pub items: Vec<T>,
    /// Explicit continuation cursor
    pub next_cursor: Option<String>,
    /// Cursor trailing the last item, used when no explicit cursor is given
    pub item_cursor: Option<String>,
}

impl<T> FetchResult<T> {
    /// Create a batch with no cursors
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
            item_cursor: None,
        }
    }

    /// Create an empty batch
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Set the explicit continuation cursor
    #[must_use]
    pub fn with_next_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.next_cursor = Some(cursor.into());
        self
    }

    /// Set the trailing item cursor
    #[must_use]
    pub fn with_item_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.item_cursor = Some(cursor.into());
        self
    }

    /// Number of items in the batch
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for FetchResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Batch Fetcher
// ============================================================================

/// Fetches one batch of at most `batch_size` items after `cursor`
#[async_trait]
pub trait BatchFetcher<T>: Send + Sync {
    async fn fetch_batch(
        &self,
        batch_size: usize,
        cursor: Option<String>,
    ) -> Result<FetchResult<T>, CallError>;
}

/// Any closure returning an owned future is a fetcher
#[async_trait]
impl<T, F, Fut> BatchFetcher<T> for F
where
    T: Send + 'static,
    F: Fn(usize, Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResult<T>, CallError>> + Send + 'static,
{
    async fn fetch_batch(
        &self,
        batch_size: usize,
        cursor: Option<String>,
    ) -> Result<FetchResult<T>, CallError> {
        self(batch_size, cursor).await
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Snapshot of run progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Completed fraction, clamped to [0, 1]
    pub fraction: f64,
    /// Items collected so far
    pub collected: usize,
    /// Requested item count
    pub target: usize,
}

impl Progress {
    /// Compute progress for `collected` out of `target`.
    ///
    /// `collected` is capped at `target`, matching what a run returns.
    pub fn new(collected: usize, target: usize) -> Self {
        let collected = collected.min(target);
        let fraction = if target == 0 {
            1.0
        } else {
            collected as f64 / target as f64
        };
        Self {
            fraction,
            collected,
            target,
        }
    }
}

/// Receives progress snapshots. Fire-and-forget.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn report(&self, progress: Progress) {
        self(progress);
    }
}

// ============================================================================
// Pagination State
// ============================================================================

/// Mutable state of a single run
#[derive(Debug, Clone)]
pub struct PaginationState<T> {
    /// Items collected so far
    pub collected: Vec<T>,
    /// Cursor for the next call
    pub cursor: Option<String>,
    /// Number of batches that advanced the cursor
    pub batch_index: u64,
    /// Requested item count
    pub target: usize,
}

impl<T> PaginationState<T> {
    /// Create state for a run of `target` items
    pub fn new(target: usize) -> Self {
        Self {
            collected: Vec::new(),
            cursor: None,
            batch_index: 0,
            target,
        }
    }

    /// Items still needed
    pub fn remaining(&self) -> usize {
        self.target.saturating_sub(self.collected.len())
    }

    /// Whether the target has been reached
    pub fn is_complete(&self) -> bool {
        self.collected.len() >= self.target
    }

    /// Current progress snapshot
    pub fn progress(&self) -> Progress {
        Progress::new(self.collected.len(), self.target)
    }
}

// ============================================================================
// Fetch Outcome
// ============================================================================

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The target was reached
    Complete,
    /// The source ran out of items before the target
    Exhausted,
    /// A terminal error stopped the run after some items were collected
    Partial {
        /// Display form of the terminal error
        reason: String,
    },
    /// The run was cancelled
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Partial { reason } => write!(f, "partial ({reason})"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Items collected by a run and how it ended
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    pub items: Vec<T>,
    pub status: RunStatus,
}

impl<T> FetchOutcome<T> {
    /// Create an outcome
    pub fn new(items: Vec<T>, status: RunStatus) -> Self {
        Self { items, status }
    }

    /// Whether the run stopped early on an error or cancellation
    pub fn is_partial(&self) -> bool {
        matches!(self.status, RunStatus::Partial { .. } | RunStatus::Cancelled)
    }

    /// Whether the target was reached
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items were collected
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
