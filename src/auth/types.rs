//! Login configuration and cached token types

use crate::error::{Error, Result};
use crate::types::offset_secs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default seconds before expiry at which a token is treated as expired
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 30;

/// Session login endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Login endpoint URL
    pub login_url: String,
    /// HTTP method for login
    pub method: String,
    /// JSON body sent to the login endpoint
    pub body: HashMap<String, String>,
    /// Dotted path to the token in the login response
    pub token_path: String,
    /// Header carrying the token on feed requests
    pub token_header: String,
    /// Prefix for the header value (e.g., "Bearer ")
    pub token_prefix: Option<String>,
    /// Dotted path to the token lifetime in seconds
    pub expires_in_path: Option<String>,
    /// Seconds before expiry at which the token is refreshed
    pub expiry_buffer_secs: i64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            login_url: String::new(),
            method: "POST".to_string(),
            body: HashMap::new(),
            token_path: "access_token".to_string(),
            token_header: "Authorization".to_string(),
            token_prefix: Some("Bearer ".to_string()),
            expires_in_path: None,
            expiry_buffer_secs: DEFAULT_EXPIRY_BUFFER_SECS,
        }
    }
}

impl LoginConfig {
    /// Create a config for the given login URL
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
            ..Self::default()
        }
    }

    /// Add a body field
    #[must_use]
    pub fn with_body_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Set the token path
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Set the expiry path
    #[must_use]
    pub fn with_expires_in_path(mut self, path: impl Into<String>) -> Self {
        self.expires_in_path = Some(path.into());
        self
    }

    /// Parsed HTTP method
    pub fn http_method(&self) -> Result<reqwest::Method> {
        reqwest::Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::invalid_value("login.method", format!("unknown method '{}'", self.method)))
    }

    /// Validate the config
    pub fn validate(&self) -> Result<()> {
        if self.login_url.is_empty() {
            return Err(Error::invalid_value("login.login_url", "must not be empty"));
        }
        url::Url::parse(&self.login_url)
            .map_err(|e| Error::invalid_value("login.login_url", e.to_string()))?;
        self.http_method()?;
        if self.token_path.is_empty() {
            return Err(Error::invalid_value("login.token_path", "must not be empty"));
        }
        if self.token_header.is_empty() {
            return Err(Error::invalid_value("login.token_header", "must not be empty"));
        }
        if self.expiry_buffer_secs < 0 {
            return Err(Error::invalid_value(
                "login.expiry_buffer_secs",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The session token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now.
    ///
    /// A lifetime past chrono's range is treated as no expiry; one before it
    /// is already expired.
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = offset_secs(Utc::now(), seconds)
            .or_else(|| (seconds < 0).then_some(DateTime::<Utc>::MIN_UTC));
        Self { token, expires_at }
    }

    /// Check if the token is expired (with the default buffer)
    pub fn is_expired(&self) -> bool {
        self.is_expired_within(DEFAULT_EXPIRY_BUFFER_SECS)
    }

    /// Check if the token expires within `buffer_secs`
    pub fn is_expired_within(&self, buffer_secs: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => match offset_secs(Utc::now(), buffer_secs) {
                Some(deadline) => deadline >= expires_at,
                None => buffer_secs > 0,
            },
            None => false, // No expiration = never expires
        }
    }
}
