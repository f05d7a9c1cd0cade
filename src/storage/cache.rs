use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Fast-path world cache: bincode-encoded worlds keyed by world name.
pub struct WorldCache {
    inner: Mutex<LruCache<String, Vec<u8>>>,
}

impl WorldCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn put(&self, name: &str, bytes: Vec<u8>) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(name.to_string(), bytes);
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn invalidate(&self, name: &str) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop(name);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let cache = WorldCache::new(2);
        cache.put("A", vec![1]);
        cache.put("B", vec![2]);
        assert_eq!(cache.get("A"), Some(vec![1]));
        cache.put("C", vec![3]);
        assert_eq!(cache.get("B"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let cache = WorldCache::new(0);
        cache.put("A", vec![1]);
        assert_eq!(cache.get("A"), Some(vec![1]));
        cache.invalidate("A");
        assert!(cache.is_empty());
    }
}
