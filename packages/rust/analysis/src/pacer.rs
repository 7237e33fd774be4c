//! Explicit pacing between delegated-service calls.
//!
//! The upstream completion service rate-limits aggressively, so the batch
//! driver pauses between consecutive calls. Pacing is an injected component
//! rather than ambient state, which keeps tests deterministic under a paused
//! tokio clock.

use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum interval between consecutive calls.
pub struct Pacer {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// A pacer that never sleeps, for tests and offline runs.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Sleep out whatever remains of the minimum interval since the last
    /// call. The first call never sleeps.
    pub async fn pause(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_are_spaced() {
        let mut pacer = Pacer::new(Duration::from_secs(1));
        let start = Instant::now();

        pacer.pause().await;
        pacer.pause().await;
        pacer.pause().await;

        // First call is free; the next two each wait out the interval.
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_does_not_sleep() {
        let mut pacer = Pacer::new(Duration::from_secs(60));
        let start = Instant::now();
        pacer.pause().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn unthrottled_never_sleeps() {
        let mut pacer = Pacer::unthrottled();
        let start = Instant::now();
        for _ in 0..10 {
            pacer.pause().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
