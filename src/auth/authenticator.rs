//! Session authenticator
//!
//! Logs in against a JSON endpoint, caches the returned token, and applies
//! it to outgoing feed requests.

use super::types::{CachedToken, LoginConfig};
use crate::error::{CallError, Error, Result};
use crate::http::classify_response;
use crate::rate_limit::Authenticate;
use crate::types::offset_secs;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Authenticator for session-token APIs
pub struct SessionAuthenticator {
    /// Login configuration
    config: LoginConfig,
    /// Parsed login method
    method: Method,
    /// Cached session token
    cached_token: RwLock<Option<CachedToken>>,
    /// HTTP client for login requests
    http_client: Client,
}

impl SessionAuthenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: LoginConfig) -> Result<Self> {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: LoginConfig, http_client: Client) -> Result<Self> {
        config.validate()?;
        let method = config.http_method()?;
        Ok(Self {
            config,
            method,
            cached_token: RwLock::new(None),
            http_client,
        })
    }

    /// Get the login config
    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    /// Log in and cache a fresh token
    pub async fn login(&self) -> Result<()> {
        self.try_login()
            .await
            .map_err(|e| Error::auth(e.to_string()))
    }

    /// Log in and cache a fresh token, reporting a classified failure
    pub async fn try_login(&self) -> std::result::Result<(), CallError> {
        let token = self.fetch_token().await?;
        *self.cached_token.write().await = Some(token);
        info!("Logged in at {}", self.config.login_url);
        Ok(())
    }

    /// Whether a token is cached and not expired
    pub async fn has_valid_token(&self) -> bool {
        self.cached_token
            .read()
            .await
            .as_ref()
            .is_some_and(|t| !t.is_expired_within(self.config.expiry_buffer_secs))
    }

    /// Apply the session header to a request, logging in first if needed
    pub async fn apply(
        &self,
        req: RequestBuilder,
    ) -> std::result::Result<RequestBuilder, CallError> {
        let token = self.get_or_login().await?;
        let value = format!(
            "{}{}",
            self.config.token_prefix.as_deref().unwrap_or(""),
            token
        );
        Ok(req.header(self.config.token_header.as_str(), value))
    }

    /// Clear the cached token
    pub async fn clear(&self) {
        *self.cached_token.write().await = None;
    }

    /// Get a valid token, logging in if necessary
    async fn get_or_login(&self) -> std::result::Result<String, CallError> {
        let buffer = self.config.expiry_buffer_secs;
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired_within(buffer) {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have logged in while we waited for the write lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired_within(buffer) {
                return Ok(token.token.clone());
            }
        }

        debug!("No valid session token, logging in");
        let token = self.fetch_token().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Call the login endpoint and extract the token
    async fn fetch_token(&self) -> std::result::Result<CachedToken, CallError> {
        let response = self
            .http_client
            .request(self.method.clone(), &self.config.login_url)
            .json(&self.config.body)
            .send()
            .await
            .map_err(|e| CallError::transient(format!("Login request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            warn!("Login failed with status {}", status.as_u16());
            // Rejected credentials are not an expired session
            return Err(match classify_response(status, &headers, &body) {
                CallError::AuthExpired { message } => CallError::client(status.as_u16(), message),
                other => other,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CallError::transient(format!("Invalid login response: {e}")))?;

        let token_path = &self.config.token_path;
        let token = extract_jsonpath(&body, token_path).ok_or_else(|| {
            CallError::client(
                status.as_u16(),
                format!("Could not extract token from path: {token_path}"),
            )
        })?;

        let expires_at = self
            .config
            .expires_in_path
            .as_deref()
            .and_then(|path| extract_jsonpath(&body, path))
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| offset_secs(Utc::now(), secs));

        Ok(CachedToken::new(token, expires_at))
    }
}

#[async_trait]
impl Authenticate for SessionAuthenticator {
    async fn authenticate(&self) -> std::result::Result<(), CallError> {
        self.try_login().await
    }
}

impl std::fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("login_url", &self.config.login_url)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Look up a value by a simple dotted path.
///
/// Supports paths like "$.data.token" or "data.token". An empty path or "$"
/// returns the root.
pub fn lookup_jsonpath<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Extract a scalar from JSON using a simple dotted path
pub fn extract_jsonpath(value: &Value, path: &str) -> Option<String> {
    match lookup_jsonpath(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
