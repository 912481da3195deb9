//! Human pacing module
//!
//! Produces the delays a paginated run waits between batches and after a
//! login, so traffic looks like a person scrolling rather than a crawler.
//!
//! # Profiles
//!
//! - **Organic** (default): log-normal short pauses with occasional
//!   exponential long breaks
//! - **Uniform**: flat short pauses in [3, 8] s and long breaks in [30, 70] s
//!
//! [`NoPacing`] disables every delay.

mod models;
mod types;

pub use models::{HumanPacing, NoPacing};
pub use types::{OrganicParams, PacingConfig, PacingModel, PacingProfile, UniformParams};

#[cfg(test)]
mod tests;
