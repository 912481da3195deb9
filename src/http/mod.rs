//! HTTP feed source module
//!
//! A concrete feed source for JSON APIs built on reqwest.
//!
//! # Features
//!
//! - **Single-attempt calls**: Retries belong to the rate limit handler
//! - **Response classification**: 429, 401/419, other 4xx, and 5xx map onto `CallError`
//! - **Configurable layout**: Item array, cursor paths, and parameter names come from config
//! - **User lookup**: Screen names resolve to user ids through a configurable endpoint
//! - **Authentication**: Optional session header from the auth module

mod classify;
mod client;
mod types;

pub use classify::{classify_response, classify_transport_error, header_map, retry_after};
pub use client::{decode_page, decode_user, HttpFeedSource};
pub use types::{SourceConfig, SCREEN_NAME_PLACEHOLDER, USER_ID_PLACEHOLDER};
