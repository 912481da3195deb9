//! Feed scraper
//!
//! The two fetch operations, timeline and search, expressed as pagination
//! runs over a [`FeedSource`].

use super::types::{FeedSource, FeedUser, SearchParameters, SearchType, UserRef};
use crate::cancel::CancelToken;
use crate::error::{CallError, Error, Result};
use crate::pacing::{HumanPacing, PacingConfig, PacingModel};
use crate::pagination::{
    BatchFetcher, FetchOutcome, FetchResult, PaginationDriver, ProgressSink, PER_PAGE_CAP,
};
use crate::rate_limit::{Authenticate, RateLimitConfig, RateLimitHandler};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Fetches timelines and searches from a feed source
pub struct FeedScraper<S: FeedSource> {
    source: Arc<S>,
    driver: PaginationDriver,
    pacing: Arc<dyn PacingModel>,
    authenticator: Option<Arc<dyn Authenticate>>,
}

impl<S: FeedSource> FeedScraper<S> {
    /// Start building a scraper over `source`
    pub fn builder(source: S) -> FeedScraperBuilder<S> {
        FeedScraperBuilder::new(Arc::new(source))
    }

    /// Get the feed source
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Get the pagination driver
    pub fn driver(&self) -> &PaginationDriver {
        &self.driver
    }

    /// Log in through the rate limit handler, then pause like a person would.
    pub async fn authenticate(&self) -> Result<()> {
        let Some(auth) = self.authenticator.as_ref() else {
            return Err(Error::auth("No authenticator configured"));
        };

        let cancel = self.driver.cancel_token();
        self.driver
            .handler()
            .execute_with_cancel(|| auth.authenticate(), cancel)
            .await?;

        let delay = self.pacing.post_auth_delay();
        info!("Authenticated, settling for {:.2}s", delay.as_secs_f64());
        cancel.sleep(delay).await
    }

    /// Look up an account by screen name through the rate limit handler
    pub async fn user_by_screen_name(&self, screen_name: &str) -> Result<FeedUser> {
        let name = screen_name.trim().trim_start_matches('@');
        if name.is_empty() {
            return Err(Error::invalid_value("screen_name", "must not be empty"));
        }

        let user = self
            .driver
            .handler()
            .execute_with_cancel(
                || self.source.user_by_screen_name(name),
                self.driver.cancel_token(),
            )
            .await?;
        info!("Retrieved user: {} (ID: {})", user.screen_name, user.id);
        Ok(user)
    }

    /// Turn a user reference into a user id, looking up screen names
    pub async fn resolve_user_id(&self, user: &UserRef) -> Result<String> {
        match user {
            UserRef::Id(id) => Ok(id.clone()),
            UserRef::ScreenName(name) => Ok(self.user_by_screen_name(name).await?.id),
        }
    }

    /// Collect a timeline addressed by id or screen name
    pub async fn fetch_user_timeline(
        &self,
        user: &UserRef,
        count: usize,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<FetchOutcome<S::Item>> {
        let user_id = self.resolve_user_id(user).await?;
        self.fetch_timeline(&user_id, count, sink).await
    }

    /// Collect up to `count` items from a user's timeline
    pub async fn fetch_timeline(
        &self,
        user_id: &str,
        count: usize,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<FetchOutcome<S::Item>> {
        info!("Fetching {count} timeline items for user {user_id}");
        let fetcher = TimelineFetcher {
            source: self.source.as_ref(),
            user_id,
        };
        let outcome: FetchOutcome<S::Item> = self.driver.run(&fetcher, count, sink).await?;
        info!(
            "Timeline fetch for user {user_id} finished: {} items, {}",
            outcome.len(),
            outcome.status
        );
        Ok(outcome)
    }

    /// Collect search results
    pub async fn search(
        &self,
        params: &SearchParameters,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<FetchOutcome<S::Item>> {
        params.validate()?;
        let query = params.build_query();
        let search_type = params.search_type();
        info!(
            "Searching '{query}' ({}, type {}) for {} items",
            params.mode,
            search_type.as_str(),
            params.count
        );

        let fetcher = SearchFetcher {
            source: self.source.as_ref(),
            query: &query,
            search_type,
        };
        let outcome: FetchOutcome<S::Item> =
            self.driver.run(&fetcher, params.count, sink).await?;
        info!(
            "Search '{query}' finished: {} items, {}",
            outcome.len(),
            outcome.status
        );
        Ok(outcome)
    }
}

// ============================================================================
// Batch Fetchers
// ============================================================================

struct TimelineFetcher<'a, S> {
    source: &'a S,
    user_id: &'a str,
}

#[async_trait]
impl<S: FeedSource> BatchFetcher<S::Item> for TimelineFetcher<'_, S> {
    async fn fetch_batch(
        &self,
        batch_size: usize,
        cursor: Option<String>,
    ) -> std::result::Result<FetchResult<S::Item>, CallError> {
        self.source
            .timeline_batch(self.user_id, batch_size, cursor)
            .await
    }
}

struct SearchFetcher<'a, S> {
    source: &'a S,
    query: &'a str,
    search_type: SearchType,
}

#[async_trait]
impl<S: FeedSource> BatchFetcher<S::Item> for SearchFetcher<'_, S> {
    async fn fetch_batch(
        &self,
        batch_size: usize,
        cursor: Option<String>,
    ) -> std::result::Result<FetchResult<S::Item>, CallError> {
        self.source
            .search_batch(self.query, self.search_type, batch_size, cursor)
            .await
    }
}

impl<S: FeedSource> std::fmt::Debug for FeedScraper<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedScraper")
            .field("driver", &self.driver)
            .field("has_authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`FeedScraper`]
pub struct FeedScraperBuilder<S: FeedSource> {
    source: Arc<S>,
    rate_limit: RateLimitConfig,
    pacing: Option<Arc<dyn PacingModel>>,
    authenticator: Option<Arc<dyn Authenticate>>,
    page_cap: usize,
    cancel: CancelToken,
    seed: Option<u64>,
}

impl<S: FeedSource> FeedScraperBuilder<S> {
    fn new(source: Arc<S>) -> Self {
        Self {
            source,
            rate_limit: RateLimitConfig::default(),
            pacing: None,
            authenticator: None,
            page_cap: PER_PAGE_CAP,
            cancel: CancelToken::new(),
            seed: None,
        }
    }

    /// Set the rate limit config
    #[must_use]
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Set the pacing model
    #[must_use]
    pub fn pacing(mut self, pacing: Arc<dyn PacingModel>) -> Self {
        self.pacing = Some(pacing);
        self
    }

    /// Set the login and reauthentication capability
    #[must_use]
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticate>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Set the largest batch requested per call
    #[must_use]
    pub fn page_cap(mut self, page_cap: usize) -> Self {
        self.page_cap = page_cap;
        self
    }

    /// Set the cancellation token
    #[must_use]
    pub fn cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Seed the rate limit handler's random source
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the scraper
    pub fn build(self) -> Result<FeedScraper<S>> {
        self.rate_limit.validate()?;

        let mut handler = RateLimitHandler::new(self.rate_limit);
        if let Some(seed) = self.seed {
            handler = handler.with_seed(seed);
        }
        if let Some(auth) = &self.authenticator {
            handler = handler.with_reauthenticator(Arc::clone(auth));
        }

        let pacing: Arc<dyn PacingModel> = match self.pacing {
            Some(pacing) => pacing,
            None => Arc::new(HumanPacing::new(PacingConfig::default())?),
        };

        let driver = PaginationDriver::new(Arc::new(handler), Arc::clone(&pacing))
            .with_page_cap(self.page_cap)
            .with_cancel(self.cancel);

        Ok(FeedScraper {
            source: self.source,
            driver,
            pacing,
            authenticator: self.authenticator,
        })
    }
}
