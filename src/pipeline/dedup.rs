use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;

/// Per-bucket "seen" sets. A single short mutex guards the index; it is held
/// only around map operations, writers carry their own locks.
#[derive(Default)]
pub struct DedupIndex {
    sets: Mutex<AHashMap<String, AHashSet<String>>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` under `bucket`. Returns true the first time the pair is
    /// seen.
    pub fn insert(&self, bucket: &str, value: &str) -> bool {
        let mut sets = self.sets.lock();
        match sets.get_mut(bucket) {
            Some(set) => set.insert(value.to_string()),
            None => {
                let mut set = AHashSet::new();
                set.insert(value.to_string());
                sets.insert(bucket.to_string(), set);
                true
            }
        }
    }

    pub fn contains(&self, bucket: &str, value: &str) -> bool {
        self.sets
            .lock()
            .get(bucket)
            .map(|set| set.contains(value))
            .unwrap_or(false)
    }

    /// Distinct values recorded under `bucket`.
    pub fn len(&self, bucket: &str) -> usize {
        self.sets.lock().get(bucket).map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let idx = DedupIndex::new();
        assert!(idx.insert("routes.passive", "https://x/y"));
        assert!(!idx.insert("routes.passive", "https://x/y"));
        // same value, different bucket
        assert!(idx.insert("routes.active", "https://x/y"));
        assert_eq!(idx.len("routes.passive"), 1);
        assert!(idx.contains("routes.active", "https://x/y"));
    }
}
