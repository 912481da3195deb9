//! Pacing configuration and the pacing trait

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source of human-like delays for a paginated run
pub trait PacingModel: Send + Sync {
    /// Delay to wait after the batch numbered `batch_index` (1-based)
    fn batch_delay(&self, batch_index: u64) -> Duration;

    /// Delay to wait right after a successful login
    fn post_auth_delay(&self) -> Duration;
}

/// Parameters of the organic profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganicParams {
    /// Mean of the underlying normal for the short pause
    pub short_mu: f64,
    /// Standard deviation of the underlying normal for the short pause
    pub short_sigma: f64,
    /// Cap on a short pause in seconds
    pub short_cap: f64,
    /// Mean of the exponential long break in seconds
    pub long_mean: f64,
    /// Cap on a long break in seconds
    pub long_cap: f64,
}

impl Default for OrganicParams {
    fn default() -> Self {
        Self {
            short_mu: 0.8,
            short_sigma: 0.6,
            short_cap: 10.0,
            long_mean: 40.0,
            long_cap: 120.0,
        }
    }
}

/// Parameters of the uniform profile, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformParams {
    pub short_min: f64,
    pub short_max: f64,
    pub long_min: f64,
    pub long_max: f64,
}

impl Default for UniformParams {
    fn default() -> Self {
        Self {
            short_min: 3.0,
            short_max: 8.0,
            long_min: 30.0,
            long_max: 70.0,
        }
    }
}

/// Shape of the pause distributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PacingProfile {
    /// Log-normal short pauses, exponential long breaks
    Organic(OrganicParams),
    /// Flat short pauses and long breaks
    Uniform(UniformParams),
}

impl Default for PacingProfile {
    fn default() -> Self {
        Self::Organic(OrganicParams::default())
    }
}

/// Configuration for [`HumanPacing`](super::HumanPacing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause distributions
    pub profile: PacingProfile,
    /// Every n-th batch takes a long break; 0 disables long breaks
    pub long_break_every: u64,
    /// Chance of an extra typing pause after login
    pub micro_pause_probability: f64,
    /// Lower bound of the typing pause in seconds
    pub micro_pause_min: f64,
    /// Upper bound of the typing pause in seconds
    pub micro_pause_max: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            profile: PacingProfile::default(),
            long_break_every: 10,
            micro_pause_probability: 1.0 / 3.0,
            micro_pause_min: 0.2,
            micro_pause_max: 1.0,
        }
    }
}

impl PacingConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the uniform profile with default bounds
    #[must_use]
    pub fn uniform(mut self) -> Self {
        self.profile = PacingProfile::Uniform(UniformParams::default());
        self
    }

    /// Set the long break interval
    #[must_use]
    pub fn with_long_break_every(mut self, every: u64) -> Self {
        self.long_break_every = every;
        self
    }

    /// Set the post-login typing pause probability
    #[must_use]
    pub fn with_micro_pause_probability(mut self, probability: f64) -> Self {
        self.micro_pause_probability = probability;
        self
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<()> {
        match &self.profile {
            PacingProfile::Organic(p) => {
                check_non_negative("pacing.profile.short_sigma", p.short_sigma)?;
                check_non_negative("pacing.profile.short_cap", p.short_cap)?;
                check_non_negative("pacing.profile.long_cap", p.long_cap)?;
                if !p.short_mu.is_finite() {
                    return Err(Error::invalid_value(
                        "pacing.profile.short_mu",
                        "must be a finite number",
                    ));
                }
                if !p.long_mean.is_finite() || p.long_mean <= 0.0 {
                    return Err(Error::invalid_value(
                        "pacing.profile.long_mean",
                        format!("must be positive, got {}", p.long_mean),
                    ));
                }
            }
            PacingProfile::Uniform(p) => {
                check_range("pacing.profile.short", p.short_min, p.short_max)?;
                check_range("pacing.profile.long", p.long_min, p.long_max)?;
            }
        }

        if !(0.0..=1.0).contains(&self.micro_pause_probability) {
            return Err(Error::invalid_value(
                "pacing.micro_pause_probability",
                format!("must be within [0, 1], got {}", self.micro_pause_probability),
            ));
        }
        check_range("pacing.micro_pause", self.micro_pause_min, self.micro_pause_max)
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_value(
            field,
            format!("must be a non-negative number, got {value}"),
        ))
    }
}

fn check_range(field: &str, min: f64, max: f64) -> Result<()> {
    check_non_negative(&format!("{field}_min"), min)?;
    if !max.is_finite() || max < min {
        return Err(Error::invalid_value(
            format!("{field}_max"),
            format!("must be >= {min}, got {max}"),
        ));
    }
    Ok(())
}
