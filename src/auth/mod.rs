//! Authentication module
//!
//! Session login against a JSON endpoint. The `SessionAuthenticator` caches
//! the session token, applies it to feed requests, and doubles as the
//! reauthentication capability of the rate limit handler.

mod authenticator;
mod types;

pub use authenticator::{extract_jsonpath, lookup_jsonpath, SessionAuthenticator};
pub use types::{CachedToken, LoginConfig, DEFAULT_EXPIRY_BUFFER_SECS};
