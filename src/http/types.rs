//! HTTP feed source configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Placeholder in `timeline_path` replaced by the user id
pub const USER_ID_PLACEHOLDER: &str = "{user_id}";

/// Placeholder in `user_lookup_path` replaced by the screen name
pub const SCREEN_NAME_PLACEHOLDER: &str = "{screen_name}";

/// Configuration for a JSON-over-HTTP feed API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL for all requests
    pub base_url: String,
    /// Timeline endpoint path, containing `{user_id}`
    pub timeline_path: String,
    /// Search endpoint path
    pub search_path: String,
    /// User lookup endpoint path, containing `{screen_name}`
    pub user_lookup_path: String,
    /// Dotted path to the user id in the lookup response
    pub user_id_path: String,
    /// Query parameter carrying the batch size
    pub count_param: String,
    /// Query parameter carrying the cursor
    pub cursor_param: String,
    /// Query parameter carrying the search query
    pub query_param: String,
    /// Query parameter carrying the search type
    pub search_type_param: String,
    /// Dotted path to the item array; empty for a root array
    pub items_path: String,
    /// Dotted path to the explicit continuation cursor
    pub next_cursor_path: Option<String>,
    /// Dotted path inside each item to its own cursor
    pub item_cursor_field: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Default headers for all requests
    pub headers: HashMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeline_path: "/users/{user_id}/items".to_string(),
            search_path: "/search".to_string(),
            user_lookup_path: "/users/by/screen_name/{screen_name}".to_string(),
            user_id_path: "data.id".to_string(),
            count_param: "count".to_string(),
            cursor_param: "cursor".to_string(),
            query_param: "q".to_string(),
            search_type_param: "type".to_string(),
            items_path: "data".to_string(),
            next_cursor_path: Some("meta.next_cursor".to_string()),
            item_cursor_field: None,
            timeout_secs: 30,
            user_agent: format!("feedpace/{}", env!("CARGO_PKG_VERSION")),
            headers: HashMap::new(),
        }
    }
}

impl SourceConfig {
    /// Create a config for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Add a default header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the item array path
    #[must_use]
    pub fn with_items_path(mut self, path: impl Into<String>) -> Self {
        self.items_path = path.into();
        self
    }

    /// Set the user lookup endpoint and the path to the id in its response
    #[must_use]
    pub fn with_user_lookup(
        mut self,
        lookup_path: impl Into<String>,
        id_path: impl Into<String>,
    ) -> Self {
        self.user_lookup_path = lookup_path.into();
        self.user_id_path = id_path.into();
        self
    }

    /// Set the per-item cursor field
    #[must_use]
    pub fn with_item_cursor_field(mut self, field: impl Into<String>) -> Self {
        self.item_cursor_field = Some(field.into());
        self
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("source.base_url", e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(Error::invalid_value(
                "source.base_url",
                "must be a hierarchical URL",
            ));
        }
        if !self.timeline_path.contains(USER_ID_PLACEHOLDER) {
            return Err(Error::invalid_value(
                "source.timeline_path",
                format!("must contain {USER_ID_PLACEHOLDER}"),
            ));
        }
        if !self.user_lookup_path.contains(SCREEN_NAME_PLACEHOLDER) {
            return Err(Error::invalid_value(
                "source.user_lookup_path",
                format!("must contain {SCREEN_NAME_PLACEHOLDER}"),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("source.timeout_secs", "must be positive"));
        }
        for (field, value) in [
            ("source.count_param", &self.count_param),
            ("source.cursor_param", &self.cursor_param),
            ("source.query_param", &self.query_param),
            ("source.search_type_param", &self.search_type_param),
            ("source.user_id_path", &self.user_id_path),
        ] {
            if value.is_empty() {
                return Err(Error::invalid_value(field, "must not be empty"));
            }
        }
        Ok(())
    }
}
