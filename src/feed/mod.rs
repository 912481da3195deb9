//! Feed operations
//!
//! "Fetch timeline" and "search" over any [`FeedSource`]. Both share the
//! same pagination driver, so they get identical retry, reauthentication,
//! throttling, and pacing behavior. Timelines can be addressed by screen
//! name, which is resolved to a user id through the same handler.

mod scraper;
mod types;

pub use scraper::{FeedScraper, FeedScraperBuilder};
pub use types::{
    FeedSource, FeedUser, SearchMode, SearchParameters, SearchType, UserRef, DEFAULT_SEARCH_COUNT,
};
