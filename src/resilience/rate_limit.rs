//! Minimum-interval rate limiter.

use super::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Spaces consecutive calls by at least `60 / max_calls_per_minute` seconds.
///
/// This is a single-slot floor on the gap between calls, not a token bucket:
/// there is no burst allowance. The lock is held across the pacing sleep, so
/// concurrent callers queue up behind each other.
pub struct RateLimiter {
    min_interval: Duration,
    last_acquire: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_calls_per_minute` calls. Zero disables pacing.
    pub fn per_minute(max_calls_per_minute: u32, clock: Arc<dyn Clock>) -> Self {
        let min_interval = if max_calls_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(60.0 / max_calls_per_minute as f64)
        };

        Self {
            min_interval,
            last_acquire: Mutex::new(None),
            clock,
        }
    }

    /// Minimum gap enforced between two acquisitions.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next call is allowed, then claim the slot.
    pub async fn acquire(&self) {
        let mut last = self.last_acquire.lock().await;

        if let Some(previous) = *last {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("Rate limit: sleeping {:.2}s before next call", wait.as_secs_f64());
                self.clock.sleep(wait).await;
            }
        }

        *last = Some(self.clock.now());
    }
}
