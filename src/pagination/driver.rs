//! Pagination driver
//!
//! Runs the batched cursor loop shared by every feed operation. Each batch
//! goes through the rate limit handler, then the pacing model decides how
//! long to wait before the next one.

use super::types::{
    BatchFetcher, FetchOutcome, PaginationState, ProgressSink, RunStatus, PER_PAGE_CAP,
};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::pacing::PacingModel;
use crate::rate_limit::RateLimitHandler;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collects up to a target number of items across cursor-paginated batches
#[derive(Clone)]
pub struct PaginationDriver {
    handler: Arc<RateLimitHandler>,
    pacing: Arc<dyn PacingModel>,
    page_cap: usize,
    cancel: CancelToken,
}

impl PaginationDriver {
    /// Create a driver with the default page cap
    pub fn new(handler: Arc<RateLimitHandler>, pacing: Arc<dyn PacingModel>) -> Self {
        Self {
            handler,
            pacing,
            page_cap: PER_PAGE_CAP,
            cancel: CancelToken::new(),
        }
    }

    /// Set the largest batch to request. Zero is raised to one.
    #[must_use]
    pub fn with_page_cap(mut self, page_cap: usize) -> Self {
        self.page_cap = page_cap.max(1);
        self
    }

    /// Stop runs when `cancel` fires
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the rate limit handler
    pub fn handler(&self) -> &Arc<RateLimitHandler> {
        &self.handler
    }

    /// Get the page cap
    pub fn page_cap(&self) -> usize {
        self.page_cap
    }

    /// Get the cancellation token
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Collect up to `target` items from `fetcher`.
    ///
    /// A terminal error after some items were collected yields a
    /// [`RunStatus::Partial`] outcome instead of an error. Items are returned
    /// in fetch order and never exceed `target`.
    pub async fn run<T, B>(
        &self,
        fetcher: &B,
        target: usize,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<FetchOutcome<T>>
    where
        B: BatchFetcher<T> + ?Sized,
        T: Send,
    {
        let mut state = PaginationState::new(target);
        if target == 0 {
            return Ok(FetchOutcome::new(Vec::new(), RunStatus::Complete));
        }

        let status = loop {
            let batch_size = self.page_cap.min(state.remaining());
            let cursor = state.cursor.clone();

            let result = self
                .handler
                .execute_with_cancel(
                    || fetcher.fetch_batch(batch_size, cursor.clone()),
                    &self.cancel,
                )
                .await;

            let batch = match result {
                Ok(batch) => batch,
                Err(Error::Cancelled) => {
                    warn!(
                        "Fetch cancelled after {} of {target} items",
                        state.collected.len()
                    );
                    break RunStatus::Cancelled;
                }
                Err(e) if !state.collected.is_empty() => {
                    warn!(
                        "Fetch stopped after {} of {target} items: {e}",
                        state.collected.len()
                    );
                    break RunStatus::Partial {
                        reason: e.to_string(),
                    };
                }
                Err(e) => return Err(e),
            };

            if batch.is_empty() {
                info!("No more items available");
                break RunStatus::Exhausted;
            }

            let received = batch.items.len();
            state.collected.extend(batch.items);
            let progress = state.progress();
            if let Some(sink) = sink {
                sink.report(progress);
            }
            info!(
                "Batch {}: received {received} items ({}/{target}, {:.0}%)",
                state.batch_index + 1,
                progress.collected,
                progress.fraction * 100.0
            );

            if state.is_complete() {
                break RunStatus::Complete;
            }

            let next_cursor = batch.next_cursor.or(if received < batch_size {
                None
            } else {
                batch.item_cursor
            });

            let Some(next_cursor) = next_cursor else {
                info!("No continuation cursor, stopping");
                break RunStatus::Exhausted;
            };

            if state.cursor.as_deref() == Some(next_cursor.as_str()) {
                warn!("Cursor repeated ({next_cursor}), stopping");
                break RunStatus::Exhausted;
            }

            state.cursor = Some(next_cursor);
            state.batch_index += 1;

            let delay = self.pacing.batch_delay(state.batch_index);
            debug!(
                "Waiting {:.2}s before batch {}",
                delay.as_secs_f64(),
                state.batch_index + 1
            );
            if self.cancel.sleep(delay).await.is_err() {
                warn!(
                    "Fetch cancelled after {} of {target} items",
                    state.collected.len()
                );
                break RunStatus::Cancelled;
            }
        };

        state.collected.truncate(target);
        Ok(FetchOutcome::new(state.collected, status))
    }
}

impl std::fmt::Debug for PaginationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationDriver")
            .field("handler", &self.handler)
            .field("page_cap", &self.page_cap)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
