//! Bounded exponential-backoff retry.

use super::Clock;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Retry limits: `max_retries` extra attempts, sleeping `base_delay * 2^attempt` between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Backoff before retrying after the failure of 0-based `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Runs an operation under a [`RetryPolicy`].
///
/// Every error is treated as transient. After the last attempt fails the
/// original error is returned unchanged. No jitter is applied.
#[derive(Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { policy, clock }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Call `op` until it succeeds or `max_retries + 1` attempts have failed.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.policy.max_retries => return Err(e),
                Err(e) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        "Attempt {}/{} failed for {}. Retrying in {:.1}s: {}",
                        attempt + 1,
                        attempts,
                        label,
                        delay.as_secs_f64(),
                        e
                    );
                    self.clock.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn retrier(max_retries: u32, base_secs: u64, clock: Arc<ManualClock>) -> Retrier {
        Retrier::new(RetryPolicy::new(max_retries, Duration::from_secs(base_secs)), clock)
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2));
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_exhaustion_calls_max_retries_plus_one() {
        let clock = Arc::new(ManualClock::new());
        let retrier = retrier(3, 1, clock.clone());
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retrier
            .run("always_fails", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure #{}", n)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // The last error comes back untouched
        assert_eq!(result.unwrap_err(), "failure #3");
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let clock = Arc::new(ManualClock::new());
        let retrier = retrier(10, 2, clock.clone());
        let calls = AtomicU32::new(0);

        let result: Result<&str, String> = retrier
            .run("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let clock = Arc::new(ManualClock::new());
        let retrier = retrier(0, 1, clock.clone());
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retrier
            .run("once", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("nope".to_string()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clock.sleeps().is_empty());
    }
}
