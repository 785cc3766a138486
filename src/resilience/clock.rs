//! Time source used for pacing and backoff.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Abstraction over "now" and "sleep" so pacing can be tested without real delays.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Block the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Manually driven clock: `sleep` advances time instantly and records the request.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    origin: Instant,
    state: std::sync::Mutex<ManualState>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: std::sync::Mutex::new(ManualState::default()),
        }
    }

    /// Move time forward without recording a sleep.
    pub(crate) fn advance(&self, by: Duration) {
        self.state.lock().unwrap().elapsed += by;
    }

    /// All sleeps requested so far, in order.
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().unwrap().elapsed
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.elapsed += duration;
        state.sleeps.push(duration);
    }
}
