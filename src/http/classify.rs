//! HTTP response classification
//!
//! Maps failed responses and transport errors onto [`CallError`].

use crate::error::CallError;
use crate::types::offset_secs;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::collections::HashMap;

/// Longest body excerpt kept in an error message
const BODY_EXCERPT_CHARS: usize = 200;

/// Classify a non-success response
pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: &str) -> CallError {
    let code = status.as_u16();
    let message = excerpt(status, body);

    match code {
        429 => {
            let reset_at = retry_after(headers, Utc::now());
            let headers = header_map(headers);
            CallError::RateLimited { reset_at, headers }
        }
        401 | 419 => CallError::auth_expired(message),
        400..=499 => CallError::client(code, message),
        _ => CallError::transient(message),
    }
}

/// Classify a transport error (connect, timeout, broken body)
pub fn classify_transport_error(err: &reqwest::Error) -> CallError {
    if err.is_timeout() {
        CallError::transient(format!("Request timed out: {err}"))
    } else {
        CallError::transient(format!("Request failed: {err}"))
    }
}

/// Response headers with lowercase names, skipping non-text values
pub fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

/// Instant named by a `Retry-After` header, as seconds or an HTTP date
pub fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<i64>() {
        // Out of range means the reset is unknown
        return offset_secs(now, secs.max(0));
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn excerpt(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {status}");
    }
    let mut text: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
    if body.chars().count() > BODY_EXCERPT_CHARS {
        text.push_str("...");
    }
    format!("HTTP {status}: {text}")
}
