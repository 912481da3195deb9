//! Rate limit handler
//!
//! Executes one logical remote call with resilience. The handler owns every
//! retry, backoff, and reauthentication decision and only surfaces terminal
//! failures to its caller.

use super::backoff::{compute_backoff, long_pause, server_reset_wait};
use super::quota::RequestQuota;
use super::types::{RateLimitConfig, RequestWindow};
use crate::cancel::CancelToken;
use crate::error::{CallError, Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// A capability that can establish a fresh session
#[async_trait]
pub trait Authenticate: Send + Sync {
    /// Log in again. Called when a request fails with an expired session.
    async fn authenticate(&self) -> std::result::Result<(), CallError>;
}

/// Mutable per-handler state, never held across an await
#[derive(Debug, Default)]
struct HandlerState {
    window: RequestWindow,
    last_reset_time: Option<DateTime<Utc>>,
}

/// Wraps remote calls with retry, backoff, reauthentication, and throttling
pub struct RateLimitHandler {
    config: RateLimitConfig,
    state: Mutex<HandlerState>,
    rng: Mutex<StdRng>,
    reauthenticator: Option<Arc<dyn Authenticate>>,
    quota: Option<RequestQuota>,
}

impl RateLimitHandler {
    /// Create a handler with the given config
    pub fn new(config: RateLimitConfig) -> Self {
        let quota = config.requests_per_minute.map(RequestQuota::per_minute);
        Self {
            config,
            state: Mutex::new(HandlerState::default()),
            rng: Mutex::new(StdRng::from_os_rng()),
            reauthenticator: None,
            quota,
        }
    }

    /// Attach a reauthentication capability
    #[must_use]
    pub fn with_reauthenticator(mut self, auth: Arc<dyn Authenticate>) -> Self {
        self.reauthenticator = Some(auth);
        self
    }

    /// Use a seeded random source for jitter and pauses
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Get the config
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether a reauthentication capability is attached
    pub fn has_reauthenticator(&self) -> bool {
        self.reauthenticator.is_some()
    }

    /// Last server-advertised reset instant that was honored
    pub fn last_reset_time(&self) -> Option<DateTime<Utc>> {
        self.state().last_reset_time
    }

    /// Number of successful requests in the current throttle window
    pub fn recent_requests(&self) -> usize {
        let mut state = self.state();
        state.window.prune(Instant::now());
        state.window.len()
    }

    /// Execute `call` until it succeeds or fails terminally
    pub async fn execute<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, CallError>>,
    {
        self.execute_with_cancel(call, &CancelToken::new()).await
    }

    /// Execute `call`, aborting at the next suspension point once `cancel` fires
    pub async fn execute_with_cancel<T, F, Fut>(
        &self,
        mut call: F,
        cancel: &CancelToken,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, CallError>>,
    {
        let max_retries = self.config.max_retries;
        let mut retries: u32 = 0;
        let mut attempts: u32 = 0;

        loop {
            self.throttle(cancel).await?;

            attempts += 1;
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                outcome = call() => outcome,
            };

            let err = match outcome {
                Ok(value) => {
                    self.record_success();
                    return Ok(value);
                }
                Err(err) => err,
            };

            match err {
                CallError::RateLimited { .. } => {
                    retries += 1;
                    if retries > max_retries {
                        error!("Max retries ({max_retries}) exceeded for rate limiting");
                        return Err(Error::RetriesExhausted {
                            attempts,
                            last: err,
                        });
                    }

                    let wait = self.rate_limit_wait(&err, retries);
                    warn!(
                        "Rate limited. Waiting {:.2}s (retry {}/{})",
                        wait.as_secs_f64(),
                        retries,
                        max_retries
                    );
                    cancel.sleep(wait).await?;
                }

                CallError::AuthExpired { message } => {
                    let Some(auth) = self.reauthenticator.as_ref() else {
                        error!("Session expired and no reauthentication is configured");
                        return Err(Error::Unauthorized { message });
                    };

                    retries += 1;
                    if retries > max_retries {
                        error!("Max retries ({max_retries}) exceeded while reauthenticating");
                        return Err(Error::RetriesExhausted {
                            attempts,
                            last: CallError::AuthExpired { message },
                        });
                    }

                    warn!(
                        "Session expired ({message}), reauthenticating (retry {}/{})",
                        retries, max_retries
                    );
                    let login = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                        login = auth.authenticate() => login,
                    };
                    if let Err(e) = login {
                        error!("Reauthentication failed: {e}");
                        return Err(Error::ReauthenticationFailed {
                            message: e.to_string(),
                        });
                    }
                    info!("Reauthenticated, retrying call");
                }

                CallError::Client { status, message } => {
                    error!("Non-recoverable client error {status}: {message}");
                    return Err(Error::Client { status, message });
                }

                CallError::Transient { .. } => {
                    retries += 1;
                    if retries > max_retries {
                        error!("Max retries ({max_retries}) exceeded for error: {err}");
                        return Err(Error::RetriesExhausted {
                            attempts,
                            last: err,
                        });
                    }

                    let wait = self.with_rng(|rng| compute_backoff(retries, &self.config, rng));
                    warn!(
                        "{err}. Retrying in {:.2}s (retry {}/{})",
                        wait.as_secs_f64(),
                        retries,
                        max_retries
                    );
                    cancel.sleep(wait).await?;
                }
            }
        }
    }

    /// Wait time after a rate limit rejection
    fn rate_limit_wait(&self, err: &CallError, retries: u32) -> Duration {
        if self.config.respect_reset_time {
            if let Some(reset) = err.reset_time() {
                self.state().last_reset_time = Some(reset);
                info!("Using rate limit reset time: {reset}");
                return server_reset_wait(reset, Utc::now(), &self.config);
            }
        }

        self.with_rng(|rng| {
            let mut wait = compute_backoff(retries, &self.config, rng);
            if retries >= 2 {
                let pause = long_pause(rng);
                warn!(
                    "Adding long pause {:.2}s due to repeated rate limits",
                    pause.as_secs_f64()
                );
                wait += pause;
            }
            wait
        })
    }

    /// Preemptive delay based on recent volume, then the hard quota
    async fn throttle(&self, cancel: &CancelToken) -> Result<()> {
        let delay = {
            let mut state = self.state();
            state.window.prune(Instant::now());
            state.window.throttle_delay()
        };

        if let Some(delay) = delay {
            info!(
                "Preemptive rate limiting: waiting {:.2}s",
                delay.as_secs_f64()
            );
            cancel.sleep(delay).await?;
        }

        if let Some(quota) = &self.quota {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = quota.wait() => {}
            }
        }

        Ok(())
    }

    fn record_success(&self) {
        let mut state = self.state();
        state.window.record(Instant::now());
        debug!("Request succeeded ({} in window)", state.window.len());
    }

    fn state(&self) -> MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

impl std::fmt::Debug for RateLimitHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitHandler")
            .field("config", &self.config)
            .field("has_reauthenticator", &self.reauthenticator.is_some())
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}
