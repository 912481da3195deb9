//! Feed types: search parameters and the feed source trait

use crate::error::{CallError, Error, Result};
use crate::pagination::FetchResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of items a search collects
pub const DEFAULT_SEARCH_COUNT: usize = 100;

// ============================================================================
// Search Mode / Type
// ============================================================================

/// How a search should be run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Most relevant results
    #[default]
    Popular,
    /// Most recent results
    Latest,
    /// Relevant results restricted to a date range
    DateRange,
}

impl SearchMode {
    /// String form used in config and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Popular => "popular",
            Self::Latest => "latest",
            Self::DateRange => "date_range",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "popular" | "top" => Ok(Self::Popular),
            "latest" => Ok(Self::Latest),
            "date_range" => Ok(Self::DateRange),
            other => Err(Error::invalid_value(
                "mode",
                format!("unknown search mode '{other}' (expected popular, latest, or date_range)"),
            )),
        }
    }
}

/// Ranking requested from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchType {
    Top,
    Latest,
}

impl SearchType {
    /// Wire value sent to the source
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Latest => "Latest",
        }
    }
}

// ============================================================================
// Search Parameters
// ============================================================================

/// Parameters of a search operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    /// Base query text
    pub query: String,
    /// Number of items to collect
    #[serde(default = "default_search_count")]
    pub count: usize,
    /// Search mode
    #[serde(default)]
    pub mode: SearchMode,
    /// First day of a date range search
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day of a date range search
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

fn default_search_count() -> usize {
    DEFAULT_SEARCH_COUNT
}

impl SearchParameters {
    /// Create parameters for a popular search
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            count: DEFAULT_SEARCH_COUNT,
            mode: SearchMode::Popular,
            start_date: None,
            end_date: None,
        }
    }

    /// Set the item count
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the search mode
    #[must_use]
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Restrict to a date range and switch to date range mode
    #[must_use]
    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.mode = SearchMode::DateRange;
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Validate the parameters
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::invalid_value("query", "must not be empty"));
        }
        if self.mode == SearchMode::DateRange {
            match (self.start_date, self.end_date) {
                (Some(start), Some(end)) if start > end => {
                    return Err(Error::invalid_value(
                        "end_date",
                        format!("{end} is before start date {start}"),
                    ));
                }
                (Some(_), Some(_)) => {}
                _ => {
                    return Err(Error::invalid_value(
                        "date_range",
                        "date range search requires both start_date and end_date",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Query text sent to the source
    pub fn build_query(&self) -> String {
        let mut query = self.query.clone();
        if self.mode == SearchMode::DateRange {
            if let Some(start) = self.start_date {
                query.push_str(&format!(" since:{start}"));
            }
            if let Some(end) = self.end_date {
                query.push_str(&format!(" until:{end}"));
            }
        }
        query
    }

    /// Ranking for this search. Only `latest` asks for recency.
    pub fn search_type(&self) -> SearchType {
        match self.mode {
            SearchMode::Latest => SearchType::Latest,
            SearchMode::Popular | SearchMode::DateRange => SearchType::Top,
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// A feed account resolved from its screen name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedUser {
    /// Stable account identifier used by timeline requests
    pub id: String,
    /// Handle the account was looked up by
    pub screen_name: String,
}

impl FeedUser {
    /// Create a user
    pub fn new(id: impl Into<String>, screen_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            screen_name: screen_name.into(),
        }
    }
}

/// How a timeline target given on the command line or in code should be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    /// Already a user id
    Id(String),
    /// A screen name that must be looked up first
    ScreenName(String),
}

impl UserRef {
    /// Interpret `input`.
    ///
    /// A leading `@` always means a screen name. Otherwise an all-digit
    /// string is an id and anything else is a screen name.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if let Some(name) = input.strip_prefix('@') {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::invalid_value("user", "screen name must not be empty"));
            }
            return Ok(Self::ScreenName(name.to_string()));
        }
        if input.is_empty() {
            return Err(Error::invalid_value("user", "must not be empty"));
        }
        if input.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self::Id(input.to_string()))
        } else {
            Ok(Self::ScreenName(input.to_string()))
        }
    }
}

// ============================================================================
// Feed Source
// ============================================================================

/// A remote feed that serves timeline and search batches.
///
/// Each method is a single attempt; failures are classified so the caller
/// can retry them.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Item type produced by the source
    type Item: Send + 'static;

    /// Look up the account behind `screen_name` (without a leading `@`)
    async fn user_by_screen_name(
        &self,
        screen_name: &str,
    ) -> std::result::Result<FeedUser, CallError>;

    /// Fetch up to `count` timeline items for `user_id` after `cursor`
    async fn timeline_batch(
        &self,
        user_id: &str,
        count: usize,
        cursor: Option<String>,
    ) -> std::result::Result<FetchResult<Self::Item>, CallError>;

    /// Fetch up to `count` search results for `query` after `cursor`
    async fn search_batch(
        &self,
        query: &str,
        search_type: SearchType,
        count: usize,
        cursor: Option<String>,
    ) -> std::result::Result<FetchResult<Self::Item>, CallError>;
}
