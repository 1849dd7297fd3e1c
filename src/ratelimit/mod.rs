//! API key rotation and call limiting.
//!
//! Everything here is constructed explicitly and shared by `Arc` for the
//! length of one run; nothing is a process-wide singleton.

pub mod keys;
pub mod limiter;
pub mod tracker;

pub use keys::ApiKeyPool;
pub use limiter::RateLimiter;
pub use tracker::{ApiCallTracker, CallStats};

use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

/// Upper bound on a single wait, so a long window is re-polled rather than slept through blindly.
const MAX_WAIT: Duration = Duration::from_secs(30);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    #[error("no api keys configured")]
    NoKeys,

    #[error("rate limit allows no calls")]
    NoCapacity,
}

/// Hands out API keys that still have budget in the current rate window.
pub struct ApiGate {
    pool: ApiKeyPool,
    limiter: RateLimiter,
    tracker: ApiCallTracker,
}

impl ApiGate {
    pub fn new(pool: ApiKeyPool, limiter: RateLimiter) -> Self {
        Self {
            pool,
            limiter,
            tracker: ApiCallTracker::new(),
        }
    }

    /// Wait for a key with remaining capacity, trying every key once per round.
    pub async fn acquire(&self) -> Result<String, GateError> {
        if self.pool.is_empty() {
            return Err(GateError::NoKeys);
        }
        if self.limiter.max_calls() == 0 {
            return Err(GateError::NoCapacity);
        }

        loop {
            let mut shortest_wait = MAX_WAIT;

            for _ in 0..self.pool.len() {
                let Some(key) = self.pool.next_key() else {
                    return Err(GateError::NoKeys);
                };
                if self.limiter.try_acquire(key) {
                    return Ok(key.to_string());
                }
                self.tracker.record_throttled(key);
                shortest_wait = shortest_wait.min(self.limiter.retry_after(key));
            }

            debug!("All api keys throttled, waiting {:?}", shortest_wait);
            sleep(shortest_wait.max(Duration::from_millis(1))).await;
        }
    }

    pub fn record_success(&self, key: &str) {
        self.tracker.record_success(key);
    }

    pub fn record_failure(&self, key: &str) {
        self.tracker.record_failure(key);
    }

    pub fn tracker(&self) -> &ApiCallTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rotates_across_keys() {
        let gate = ApiGate::new(ApiKeyPool::new(["k1", "k2"]), RateLimiter::per_minute(10));

        assert_eq!(gate.acquire().await.unwrap(), "k1");
        assert_eq!(gate.acquire().await.unwrap(), "k2");
        assert_eq!(gate.acquire().await.unwrap(), "k1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_exhausted_key() {
        let limiter = RateLimiter::per_minute(1);
        assert!(limiter.try_acquire("k1"));
        let gate = ApiGate::new(ApiKeyPool::new(["k1", "k2"]), limiter);

        assert_eq!(gate.acquire().await.unwrap(), "k2");
        assert_eq!(gate.tracker().stats("k1").throttled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_window_when_all_exhausted() {
        let gate = ApiGate::new(
            ApiKeyPool::new(["only"]),
            RateLimiter::new(1, Duration::from_secs(5)),
        );
        let start = tokio::time::Instant::now();

        gate.acquire().await.unwrap();
        gate.acquire().await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_empty_pool_errors() {
        let gate = ApiGate::new(ApiKeyPool::new(Vec::<String>::new()), RateLimiter::per_minute(1));
        assert_eq!(gate.acquire().await, Err(GateError::NoKeys));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_fails_instead_of_waiting() {
        let gate = ApiGate::new(ApiKeyPool::new(["k1"]), RateLimiter::per_minute(0));

        let result = tokio::time::timeout(Duration::from_secs(2), gate.acquire()).await;

        assert!(matches!(result, Ok(Err(GateError::NoCapacity))));
        assert_eq!(gate.tracker().stats("k1").throttled, 0);
    }
}
