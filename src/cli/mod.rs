//! CLI module
//!
//! Command-line interface for one-off fetch runs.
//!
//! # Commands
//!
//! - `timeline` - Collect a user's timeline
//! - `search` - Collect search results

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
