use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallStats {
    pub succeeded: u64,
    pub failed: u64,
    pub throttled: u64,
}

/// Per-key call outcomes for the current run.
#[derive(Debug, Default)]
pub struct ApiCallTracker {
    calls: DashMap<String, CallStats>,
}

impl ApiCallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, key: &str) {
        self.calls.entry(key.to_string()).or_default().succeeded += 1;
    }

    pub fn record_failure(&self, key: &str) {
        self.calls.entry(key.to_string()).or_default().failed += 1;
    }

    pub fn record_throttled(&self, key: &str) {
        self.calls.entry(key.to_string()).or_default().throttled += 1;
    }

    pub fn stats(&self, key: &str) -> CallStats {
        self.calls.get(key).map(|s| *s).unwrap_or_default()
    }

    /// Ordered copy, for logging a run summary.
    pub fn snapshot(&self) -> BTreeMap<String, CallStats> {
        self.calls
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
