//! Retry policy shared by every GitHub request
//!
//! Transient failures are retried with linear backoff up to a fixed number of
//! attempts. Rate-limit responses suspend until the reset time (or a fallback
//! wait) and then repeat the same request without using up an attempt; too
//! many waits in a row end the request. Any other error ends the request
//! immediately.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use insights_core::RetrySettings;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::{Error, Result};

/// Retry, backoff and throttle parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request for transient failures
    pub max_attempts: u32,
    /// Attempt `n` (1-based) is followed by a wait of `n * backoff`
    pub backoff: Duration,
    /// Wait applied to rate limits without a usable reset time
    pub rate_limit_fallback: Duration,
    /// Consecutive rate-limit waits allowed before the request fails
    pub max_rate_limit_waits: u32,
    /// Pause before each per-issue secondary request
    pub throttle: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        (&RetrySettings::default()).into()
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            backoff: settings.backoff,
            rate_limit_fallback: settings.rate_limit_fallback,
            max_rate_limit_waits: settings.max_rate_limit_waits,
            throttle: settings.throttle,
        }
    }
}

impl RetryPolicy {
    /// Backoff after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }

    /// How long to wait for a rate limit to lift
    pub fn rate_limit_wait(&self, err: &Error) -> Duration {
        match err {
            Error::RateLimited {
                reset_at: Some(reset_at),
            } => (*reset_at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            _ => self.rate_limit_fallback,
        }
    }

    /// Sleep for the per-item throttle interval
    pub async fn throttle(&self) {
        if !self.throttle.is_zero() {
            sleep(self.throttle).await;
        }
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of attempts
    ///
    /// `resource` names what is being fetched and appears in every log line.
    pub async fn run<T, F, Fut>(&self, resource: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        let mut waits = 0;

        loop {
            let err = match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(resource, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if err.is_rate_limited() {
                if waits >= self.max_rate_limit_waits {
                    error!(
                        resource,
                        attempt,
                        waits,
                        error = %err,
                        "Still rate limited, giving up"
                    );
                    return Err(Error::RetriesExhausted {
                        resource: resource.to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                waits += 1;
                let wait = self.rate_limit_wait(&err);
                warn!(
                    resource,
                    attempt,
                    waits,
                    wait_secs = wait.as_secs_f64(),
                    "Rate limited, waiting before resuming"
                );
                sleep(wait).await;
                continue;
            }
            waits = 0;

            if !err.is_transient() {
                error!(resource, attempt, error = %err, "Request failed");
                return Err(err);
            }

            if attempt >= self.max_attempts {
                error!(
                    resource,
                    attempts = attempt,
                    error = %err,
                    "Request failed after all retries"
                );
                return Err(Error::RetriesExhausted {
                    resource: resource.to_string(),
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = self.backoff_for(attempt);
            warn!(
                resource,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient failure, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
