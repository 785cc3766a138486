//! Pacing and retry for calls into external services.
//!
//! Two independent policies compose here:
//!
//! - [`RateLimiter`] puts a floor on the gap between consecutive calls.
//! - [`Retrier`] re-runs a failed call with exponential backoff.
//!
//! [`Resilient`] stacks them with retries outside and pacing inside, so every
//! retry attempt still waits for its rate-limit slot.

mod clock;
mod rate_limit;
mod retry;

pub use clock::{Clock, SystemClock};
pub use rate_limit::RateLimiter;
pub use retry::{Retrier, RetryPolicy};

#[cfg(test)]
pub(crate) use clock::ManualClock;

use crate::config::RateLimitSettings;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

/// A retrying, rate-limited call wrapper owned by one provider.
pub struct Resilient {
    retrier: Retrier,
    limiter: RateLimiter,
}

impl Resilient {
    pub fn new(retrier: Retrier, limiter: RateLimiter) -> Self {
        Self { retrier, limiter }
    }

    /// Build from per-provider settings.
    pub fn from_settings(settings: &RateLimitSettings, clock: Arc<dyn Clock>) -> Self {
        let policy = RetryPolicy::new(settings.max_retries, settings.base_delay());
        Self {
            retrier: Retrier::new(policy, clock.clone()),
            limiter: RateLimiter::per_minute(settings.requests_per_minute, clock),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retrier.policy()
    }

    /// Run `op` with retry (outer) and rate limiting (inner).
    pub async fn call<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let limiter = &self.limiter;
        self.retrier
            .run(label, || {
                let attempt = op();
                async move {
                    limiter.acquire().await;
                    attempt.await
                }
            })
            .await
    }
}
