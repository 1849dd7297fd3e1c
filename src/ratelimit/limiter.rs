use dashmap::DashMap;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

/// Fixed-window call limiter, tracked per API key.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<DashMap<String, WindowData>>,
    max_calls: u32,
    window: Duration,
}

#[derive(Debug, Clone)]
struct WindowData {
    count: u32,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            max_calls,
            window,
        }
    }

    pub fn per_minute(max_calls: u32) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }

    /// Count a call against `key` if it still fits in the current window.
    pub fn try_acquire(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_insert_with(|| WindowData {
            count: 0,
            window_start: now,
        });

        let data = entry.value_mut();

        if now.duration_since(data.window_start) >= self.window {
            data.count = 0;
            data.window_start = now;
        }

        if data.count >= self.max_calls {
            return false;
        }

        data.count += 1;
        true
    }

    /// Time until `key` gets a fresh window. Zero if it has capacity now.
    pub fn retry_after(&self, key: &str) -> Duration {
        let Some(data) = self.store.get(key) else {
            return Duration::ZERO;
        };

        let elapsed = data.window_start.elapsed();
        if elapsed >= self.window || data.count < self.max_calls {
            Duration::ZERO
        } else {
            self.window - elapsed
        }
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }
}
