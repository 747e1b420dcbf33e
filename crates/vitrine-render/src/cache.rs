//! Fragment cache collaborator.
//!
//! Collection renders with caching enabled look every element's key up in
//! one [`FragmentCache::read_multi`] call and write back what they had to
//! render. Eviction and expiry are the cache's own business; a key missing
//! from the read result is a miss, never an error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::flow::lock;

/// Key → markup store consulted by collection renders.
pub trait FragmentCache: Send + Sync {
    /// Returns the entries present for `keys`. Absent keys are simply left out.
    fn read_multi(&self, keys: &[String]) -> HashMap<String, String>;

    /// Stores `value` under `key`.
    fn write(&self, key: &str, value: &str);
}

/// In-process [`FragmentCache`] backed by a hash map.
///
/// Counts its batch reads, which makes it useful in tests as well.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `read_multi` calls served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

impl FragmentCache for MemoryCache {
    fn read_multi(&self, keys: &[String]) -> HashMap<String, String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let entries = lock(&self.entries);
        keys.iter()
            .filter_map(|key| entries.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }

    fn write(&self, key: &str, value: &str) {
        lock(&self.entries).insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_multi_leaves_out_misses() {
        let cache = MemoryCache::new();
        cache.write("k1", "<p>one</p>");

        let found = cache.read_multi(&["k1".to_string(), "k2".to_string()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found["k1"], "<p>one</p>");
        assert_eq!(cache.read_count(), 1);
    }

    #[test]
    fn test_write_overwrites() {
        let cache = MemoryCache::new();
        cache.write("k", "a");
        cache.write("k", "b");
        assert_eq!(cache.get("k").as_deref(), Some("b"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
