//! HTTP feed source
//!
//! A [`FeedSource`] over a JSON API. Every call is a single attempt: failures
//! are classified and handed back so the rate limit handler can decide what
//! to do with them.

use super::classify::{classify_response, classify_transport_error};
use super::types::{SourceConfig, SCREEN_NAME_PLACEHOLDER, USER_ID_PLACEHOLDER};
use crate::auth::{extract_jsonpath, lookup_jsonpath, SessionAuthenticator};
use crate::error::{CallError, Error, Result};
use crate::feed::{FeedSource, FeedUser, SearchType};
use crate::pagination::FetchResult;
use crate::types::OptionStringExt;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Feed source backed by a JSON-over-HTTP API
pub struct HttpFeedSource {
    client: Client,
    config: SourceConfig,
    base_url: Url,
    authenticator: Option<Arc<SessionAuthenticator>>,
}

impl HttpFeedSource {
    /// Create a source, validating the config and building the HTTP client
    pub fn new(config: SourceConfig) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)?;

        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| Error::invalid_value(format!("source.headers.{key}"), e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::invalid_value(format!("source.headers.{key}"), e.to_string()))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
            authenticator: None,
        })
    }

    /// Attach a session authenticator applied to every request
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<SessionAuthenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Get the config
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Build an endpoint URL from a path template.
    ///
    /// Each path segment equal to a placeholder in `substitutions` is
    /// replaced by its value, percent-encoded as a single segment.
    fn endpoint(&self, path: &str, substitutions: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                let value = substitutions
                    .iter()
                    .find(|(placeholder, _)| *placeholder == segment)
                    .map_or(segment, |(_, value)| *value);
                segments.push(value);
            }
        }
        url
    }

    /// Send one GET and parse the JSON body, classifying any failure
    async fn get_json(
        &self,
        url: Url,
        query: &[(String, String)],
    ) -> std::result::Result<Value, CallError> {
        let mut req = self.client.get(url).query(query);
        if let Some(auth) = &self.authenticator {
            req = auth.apply(req).await?;
        }

        let response = req.send().await.map_err(|e| classify_transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_response(status, &headers, &body));
        }

        response
            .json()
            .await
            .map_err(|e| CallError::transient(format!("Invalid JSON response: {e}")))
    }

    /// Fetch one page and decode it
    async fn get_page(
        &self,
        url: Url,
        mut query: Vec<(String, String)>,
        count: usize,
        cursor: Option<String>,
    ) -> std::result::Result<FetchResult<Value>, CallError> {
        query.push((self.config.count_param.clone(), count.to_string()));
        if let Some(cursor) = cursor.none_if_empty() {
            query.push((self.config.cursor_param.clone(), cursor));
        }

        debug!("GET {url} ({count} items)");
        let body = self.get_json(url, &query).await?;
        decode_page(&body, &self.config)
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    type Item = Value;

    async fn user_by_screen_name(
        &self,
        screen_name: &str,
    ) -> std::result::Result<FeedUser, CallError> {
        let url = self.endpoint(
            &self.config.user_lookup_path,
            &[(SCREEN_NAME_PLACEHOLDER, screen_name)],
        );
        debug!("GET {url} (user lookup)");
        let body = self.get_json(url, &[]).await?;
        decode_user(&body, screen_name, &self.config)
    }

    async fn timeline_batch(
        &self,
        user_id: &str,
        count: usize,
        cursor: Option<String>,
    ) -> std::result::Result<FetchResult<Value>, CallError> {
        let url = self.endpoint(&self.config.timeline_path, &[(USER_ID_PLACEHOLDER, user_id)]);
        self.get_page(url, Vec::new(), count, cursor).await
    }

    async fn search_batch(
        &self,
        query: &str,
        search_type: SearchType,
        count: usize,
        cursor: Option<String>,
    ) -> std::result::Result<FetchResult<Value>, CallError> {
        let url = self.endpoint(&self.config.search_path, &[]);
        let params = vec![
            (self.config.query_param.clone(), query.to_string()),
            (
                self.config.search_type_param.clone(),
                search_type.as_str().to_string(),
            ),
        ];
        self.get_page(url, params, count, cursor).await
    }
}

impl std::fmt::Debug for HttpFeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFeedSource")
            .field("base_url", &self.base_url.as_str())
            .field("has_authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}

/// Decode a page body into a batch.
///
/// A missing or null item array is an empty batch. Any other non-array value
/// is reported as a transient failure.
pub fn decode_page(
    body: &Value,
    config: &SourceConfig,
) -> std::result::Result<FetchResult<Value>, CallError> {
    let items = match lookup_jsonpath(body, &config.items_path) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(CallError::transient(format!(
                "Expected an array at '{}', found {}",
                config.items_path,
                json_kind(other)
            )))
        }
    };

    let next_cursor = config
        .next_cursor_path
        .as_deref()
        .and_then(|path| extract_jsonpath(body, path))
        .none_if_empty();

    let item_cursor = config
        .item_cursor_field
        .as_deref()
        .zip(items.last())
        .and_then(|(field, last)| extract_jsonpath(last, field))
        .none_if_empty();

    Ok(FetchResult {
        items,
        next_cursor,
        item_cursor,
    })
}

/// Decode a user lookup body.
///
/// A body without an id at `user_id_path` means the account does not exist.
pub fn decode_user(
    body: &Value,
    screen_name: &str,
    config: &SourceConfig,
) -> std::result::Result<FeedUser, CallError> {
    extract_jsonpath(body, &config.user_id_path)
        .none_if_empty()
        .map(|id| FeedUser::new(id, screen_name))
        .ok_or_else(|| {
            CallError::client(
                404,
                format!(
                    "No user id at '{}' for screen name '{screen_name}'",
                    config.user_id_path
                ),
            )
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
