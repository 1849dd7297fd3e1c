use std::collections::HashSet;

/// Identifiers already admitted in the current run. Grows only; dropped with the run.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `identifier` and returns true if it was not seen before.
    pub fn admit(&mut self, identifier: &str) -> bool {
        if self.seen.contains(identifier) {
            return false;
        }
        self.seen.insert(identifier.to_string())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
