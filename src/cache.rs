//! Bounded TTL cache for file-existence results.
//!
//! Link detection asks the host whether a path exists; that round trip is
//! memoized here so repeated renders of the same path don't keep crossing
//! the surface boundary. Entries expire lazily on read after a TTL, and
//! insertion at capacity evicts the single oldest-inserted entry.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_millis(5000);

/// Default entry cap.
pub const DEFAULT_CAPACITY: usize = 100;

struct Entry {
    exists: bool,
    inserted_at: Instant,
}

/// Bounded map from path to existence result with lazy expiry.
///
/// Eviction is insertion-order (the first key inserted goes first), not
/// access-order. A `get` never refreshes an entry's age.
pub struct TtlCache {
    entries: HashMap<String, Entry>,
    insertion_order: VecDeque<String>,
    ttl: Duration,
    capacity: usize,
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.entries.len())
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl TtlCache {
    /// Create a cache with the given entry lifetime and capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        assert!(capacity > 0, "TtlCache capacity must be > 0");
        Self {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            ttl,
            capacity,
        }
    }

    /// Create a cache with [`DEFAULT_TTL`] and [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    /// Look up a path. Returns `None` for unknown or expired entries;
    /// expired entries are removed on the way out.
    pub fn get(&mut self, path: &str) -> Option<bool> {
        let expired = match self.entries.get(path) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
        };
        if expired {
            self.remove(path);
            return None;
        }
        self.entries.get(path).map(|e| e.exists)
    }

    /// Record an existence result, evicting the oldest-inserted entry if
    /// the cache is at capacity and `path` is not already present.
    pub fn set(&mut self, path: &str, exists: bool) {
        if let Some(entry) = self.entries.get_mut(path) {
            // Overwrite in place; insertion age is refreshed.
            entry.exists = exists;
            entry.inserted_at = Instant::now();
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            path.to_string(),
            Entry {
                exists,
                inserted_at: Instant::now(),
            },
        );
        self.insertion_order.push_back(path.to_string());
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }

    /// Number of live (possibly expired-but-unread) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, path: &str) {
        self.entries.remove(path);
        self.insertion_order.retain(|p| p != path);
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_set_then_get() {
        let mut cache = TtlCache::with_defaults();
        cache.set("/a", true);
        cache.set("/b", false);
        assert_eq!(cache.get("/a"), Some(true));
        assert_eq!(cache.get("/b"), Some(false));
        assert_eq!(cache.get("/missing"), None);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let mut cache = TtlCache::new(Duration::from_millis(20), 10);
        cache.set("/a", true);
        assert_eq!(cache.get("/a"), Some(true));
        sleep(Duration::from_millis(40));
        assert_eq!(cache.get("/a"), None);
        // Expired entry was removed, not just hidden
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_eviction_drops_first_inserted() {
        let mut cache = TtlCache::new(DEFAULT_TTL, 3);
        cache.set("/one", true);
        cache.set("/two", true);
        cache.set("/three", true);
        cache.set("/four", true);
        assert_eq!(cache.get("/one"), None, "first-inserted key evicted");
        assert_eq!(cache.get("/two"), Some(true));
        assert_eq!(cache.get("/three"), Some(true));
        assert_eq!(cache.get("/four"), Some(true));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut cache = TtlCache::new(DEFAULT_TTL, 5);
        for i in 0..20 {
            cache.set(&format!("/p{i}"), i % 2 == 0);
            assert!(cache.len() <= 5);
        }
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_overwrite_does_not_grow_or_evict() {
        let mut cache = TtlCache::new(DEFAULT_TTL, 2);
        cache.set("/a", true);
        cache.set("/b", true);
        cache.set("/a", false);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("/a"), Some(false));
        assert_eq!(cache.get("/b"), Some(true));
    }

    #[test]
    fn test_clear_empties_cache() {
        let mut cache = TtlCache::with_defaults();
        cache.set("/a", true);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("/a"), None);
    }
}
