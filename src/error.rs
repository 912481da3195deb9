//! Error types for feedpace
//!
//! Two layers of errors live here:
//!
//! - [`CallError`] is the closed set of failures a remote capability
//!   (batch fetch, login) may report. The rate limit handler branches on it.
//! - [`Error`] is the terminal error surfaced to callers once the handler
//!   has given up, plus the configuration and transport errors of the crate.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Structured header carrying the rate limit reset instant (epoch seconds)
pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

// ============================================================================
// Classified call failures
// ============================================================================

/// A classified failure from a single remote call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The server rejected the call for exceeding its rate limit
    #[error("Rate limited by upstream")]
    RateLimited {
        /// Legacy reset attribute, used when no structured header is present
        reset_at: Option<DateTime<Utc>>,
        /// Response headers (lowercase names)
        headers: HashMap<String, String>,
    },

    /// The session is no longer valid
    #[error("Authentication expired: {message}")]
    AuthExpired { message: String },

    /// A malformed or forbidden request; never retried
    #[error("Client error {status}: {message}")]
    Client { status: u16, message: String },

    /// Anything else; retried with backoff
    #[error("Transient error: {message}")]
    Transient { message: String },
}

impl CallError {
    /// Create a rate limited error with no reset information
    pub fn rate_limited() -> Self {
        Self::RateLimited {
            reset_at: None,
            headers: HashMap::new(),
        }
    }

    /// Set the legacy reset attribute on a rate limited error
    #[must_use]
    pub fn with_reset(self, reset: DateTime<Utc>) -> Self {
        match self {
            Self::RateLimited { headers, .. } => Self::RateLimited {
                reset_at: Some(reset),
                headers,
            },
            other => other,
        }
    }

    /// Add a header to a rate limited error
    #[must_use]
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            Self::RateLimited {
                reset_at,
                mut headers,
            } => {
                headers.insert(name.into().to_ascii_lowercase(), value.into());
                Self::RateLimited { reset_at, headers }
            }
            other => other,
        }
    }

    /// Create an auth expired error
    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::AuthExpired {
            message: message.into(),
        }
    }

    /// Create a client error
    pub fn client(status: u16, message: impl Into<String>) -> Self {
        Self::Client {
            status,
            message: message.into(),
        }
    }

    /// Create a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Reset instant advertised by the server, if any.
    ///
    /// The structured `x-rate-limit-reset` header wins over the legacy
    /// `reset_at` attribute. Returns `None` for other variants.
    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::RateLimited { reset_at, headers } => headers
                .get(RATE_LIMIT_RESET_HEADER)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .or(*reset_at),
            _ => None,
        }
    }

    /// Check if this failure is retried by the handler without reauthenticating
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient { .. })
    }

    /// Check if this is a rate limit rejection
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

// ============================================================================
// Terminal errors
// ============================================================================

/// The main error type for feedpace
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Terminal fetch outcomes
    // ============================================================================
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: CallError,
    },

    #[error("Unauthorized and no reauthentication available: {message}")]
    Unauthorized { message: String },

    #[error("Reauthentication failed: {message}")]
    ReauthenticationFailed { message: String },

    #[error("Client error {status}: {message}")]
    Client { status: u16, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Check if the retry budget ran out on rate limit rejections
    pub fn is_rate_limit_exceeded(&self) -> bool {
        matches!(
            self,
            Self::RetriesExhausted {
                last: CallError::RateLimited { .. },
                ..
            }
        )
    }

    /// Check if this error came from cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for feedpace
pub type Result<T> = std::result::Result<T, Error>;
