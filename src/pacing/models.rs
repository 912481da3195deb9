//! Pacing model implementations

use super::types::{PacingConfig, PacingModel, PacingProfile};
use crate::error::{Error, Result};
use crate::types::secs;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, LogNormal, Uniform};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

// ============================================================================
// No Pacing
// ============================================================================

/// Pacing that never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl PacingModel for NoPacing {
    fn batch_delay(&self, _batch_index: u64) -> Duration {
        Duration::ZERO
    }

    fn post_auth_delay(&self) -> Duration {
        Duration::ZERO
    }
}

// ============================================================================
// Human Pacing
// ============================================================================

/// Prebuilt distributions for a profile
#[derive(Debug)]
enum Sampler {
    Organic {
        short: LogNormal<f64>,
        short_cap: f64,
        long: Exp<f64>,
        long_cap: f64,
    },
    Uniform {
        short: Uniform<f64>,
        long: Uniform<f64>,
    },
}

impl Sampler {
    fn from_profile(profile: &PacingProfile) -> Result<Self> {
        match profile {
            PacingProfile::Organic(p) => Ok(Self::Organic {
                short: LogNormal::new(p.short_mu, p.short_sigma)
                    .map_err(|e| Error::invalid_value("pacing.profile.short_sigma", e.to_string()))?,
                short_cap: p.short_cap,
                long: Exp::new(1.0 / p.long_mean)
                    .map_err(|e| Error::invalid_value("pacing.profile.long_mean", e.to_string()))?,
                long_cap: p.long_cap,
            }),
            PacingProfile::Uniform(p) => Ok(Self::Uniform {
                short: Uniform::new_inclusive(p.short_min, p.short_max)
                    .map_err(|e| Error::invalid_value("pacing.profile.short_max", e.to_string()))?,
                long: Uniform::new_inclusive(p.long_min, p.long_max)
                    .map_err(|e| Error::invalid_value("pacing.profile.long_max", e.to_string()))?,
            }),
        }
    }

    fn short<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Organic {
                short, short_cap, ..
            } => short.sample(rng).min(*short_cap),
            Self::Uniform { short, .. } => short.sample(rng),
        }
    }

    fn long<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Organic { long, long_cap, .. } => long.sample(rng).min(*long_cap),
            Self::Uniform { long, .. } => long.sample(rng),
        }
    }
}

/// Randomized delays shaped like a person reading a feed
#[derive(Debug)]
pub struct HumanPacing {
    config: PacingConfig,
    sampler: Sampler,
    rng: Mutex<StdRng>,
}

impl HumanPacing {
    /// Create a pacing model, validating the config
    pub fn new(config: PacingConfig) -> Result<Self> {
        config.validate()?;
        let sampler = Sampler::from_profile(&config.profile)?;
        Ok(Self {
            config,
            sampler,
            rng: Mutex::new(StdRng::from_os_rng()),
        })
    }

    /// Use a seeded random source
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Get the config
    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    fn is_long_break(&self, batch_index: u64) -> bool {
        let every = self.config.long_break_every;
        every > 0 && batch_index > 0 && batch_index % every == 0
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

impl PacingModel for HumanPacing {
    fn batch_delay(&self, batch_index: u64) -> Duration {
        let long = self.is_long_break(batch_index);
        let delay = self.with_rng(|rng| {
            if long {
                self.sampler.long(rng)
            } else {
                self.sampler.short(rng)
            }
        });

        if long {
            info!("Taking a long break of {delay:.1}s after batch {batch_index}");
        } else {
            debug!("Pausing {delay:.2}s after batch {batch_index}");
        }
        secs(delay)
    }

    fn post_auth_delay(&self) -> Duration {
        let delay = self.with_rng(|rng| {
            let mut delay = self.sampler.short(rng);
            if rng.random::<f64>() < self.config.micro_pause_probability {
                delay += rng.random_range(self.config.micro_pause_min..=self.config.micro_pause_max);
            }
            delay
        });
        debug!("Pausing {delay:.2}s after login");
        secs(delay)
    }
}
