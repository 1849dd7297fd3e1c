use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin rotation over a fixed set of API keys.
#[derive(Debug, Default)]
pub struct ApiKeyPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl ApiKeyPool {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.trim().is_empty())
                .collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn next_key(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some(&self.keys[index])
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let pool = ApiKeyPool::new(["a", "b", "c"]);
        let picked: Vec<_> = (0..7).filter_map(|_| pool.next_key()).collect();
        assert_eq!(picked, vec!["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn test_blank_keys_dropped() {
        let pool = ApiKeyPool::new(["", "  ", "real"]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.next_key(), Some("real"));
    }

    #[test]
    fn test_empty_pool() {
        let pool = ApiKeyPool::new(Vec::<String>::new());
        assert!(pool.is_empty());
        assert_eq!(pool.next_key(), None);
    }
}
