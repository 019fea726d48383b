//! Caches for retrieved mesh bytes.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// Storage for raw bytes keyed by URL.
pub trait Cache: Send + Sync {
    fn get(&self, url: &str) -> Option<Bytes>;
    fn insert(&self, url: &str, bytes: Bytes);
}

/// A cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _url: &str) -> Option<Bytes> {
        None
    }

    fn insert(&self, _url: &str, _bytes: Bytes) {}
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, Bytes>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    size: usize,
}

impl Entries {
    fn remove(&mut self, url: &str) {
        if let Some(old) = self.map.remove(url) {
            self.size -= old.len();
            self.order.retain(|existing| existing != url);
        }
    }
}

/// In-memory cache, optionally capped at a total number of bytes.
///
/// When an insert pushes a capped cache over its limit, the oldest entries
/// are evicted first. Buffers larger than the limit are never stored.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<Entries>,
    byte_limit: Option<usize>,
}

impl MemoryCache {
    /// An unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `byte_limit` bytes of mesh data.
    #[must_use]
    pub fn with_byte_limit(byte_limit: usize) -> Self {
        Self {
            entries: Mutex::default(),
            byte_limit: Some(byte_limit),
        }
    }

    #[must_use]
    pub fn byte_limit(&self) -> Option<usize> {
        self.byte_limit
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }

    /// Total bytes currently stored.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().size
    }

    pub fn clear(&self) {
        *self.lock() = Entries::default();
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Cache for MemoryCache {
    fn get(&self, url: &str) -> Option<Bytes> {
        self.lock().map.get(url).cloned()
    }

    fn insert(&self, url: &str, bytes: Bytes) {
        let mut entries = self.lock();
        entries.remove(url);

        if self.byte_limit.is_some_and(|limit| bytes.len() > limit) {
            tracing::debug!("Not caching {url}: {} bytes exceeds the cache limit", bytes.len());
            return;
        }

        entries.size += bytes.len();
        entries.order.push_back(url.to_owned());
        entries.map.insert(url.to_owned(), bytes);

        let Some(limit) = self.byte_limit else {
            return;
        };
        while entries.size > limit {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            if let Some(evicted) = entries.map.remove(&oldest) {
                entries.size -= evicted.len();
                tracing::debug!("Evicted {oldest} from cache");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(len: usize) -> Bytes {
        Bytes::from(vec![7u8; len])
    }

    #[test]
    fn unbounded_cache_keeps_everything() {
        let cache = MemoryCache::new();
        for i in 0..50 {
            cache.insert(&format!("mesh/{i}"), buffer(100));
        }
        assert_eq!(cache.len(), 50);
        assert_eq!(cache.size(), 5000);
        assert_eq!(cache.byte_limit(), None);
    }

    #[test]
    fn byte_limit_evicts_oldest_first() {
        let cache = MemoryCache::with_byte_limit(250);
        cache.insert("mesh/1", buffer(100));
        cache.insert("mesh/2", buffer(100));
        cache.insert("mesh/3", buffer(100));

        assert_eq!(cache.get("mesh/1"), None);
        assert!(cache.get("mesh/2").is_some());
        assert!(cache.get("mesh/3").is_some());
        assert_eq!(cache.size(), 200);
    }

    #[test]
    fn reinserting_replaces_and_refreshes() {
        let cache = MemoryCache::with_byte_limit(200);
        cache.insert("mesh/1", buffer(100));
        cache.insert("mesh/2", buffer(100));
        cache.insert("mesh/1", buffer(50));
        cache.insert("mesh/3", buffer(100));

        assert_eq!(cache.get("mesh/2"), None);
        assert_eq!(cache.get("mesh/1").as_ref().map(Bytes::len), Some(50));
        assert_eq!(cache.size(), 150);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn oversized_buffer_is_not_stored() {
        let cache = MemoryCache::with_byte_limit(64);
        cache.insert("mesh/small", buffer(10));
        cache.insert("mesh/huge", buffer(65));

        assert_eq!(cache.get("mesh/huge"), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }
}
