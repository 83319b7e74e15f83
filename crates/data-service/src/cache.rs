use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Internal cache entry with its absolute expiry. Never leaves the cache.
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Keyed store with per-entry TTL and a soft entry cap.
///
/// Expiry is the only eviction policy: `get` deletes an entry it finds
/// expired, and `set` runs a best-effort sweep of already-expired entries
/// once the store grows past `max_entries`. The sweep does not guarantee the
/// store shrinks below the cap when nothing has expired yet; the contract is
/// "never serve a value past its TTL", not bounded memory.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            max_entries,
        }
    }

    /// Store a value under the default TTL.
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Store a value expiring at `now + ttl`.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );

        if self.entries.len() > self.max_entries {
            let before = self.entries.len();
            self.entries.retain(|_, e| Instant::now() < e.expires_at);
            tracing::debug!(
                "cache sweep: {} -> {} entries",
                before,
                self.entries.len()
            );
        }
    }

    /// The stored value while unexpired; an expired entry is deleted and
    /// reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        // Drop the shard guard before removing to keep DashMap happy.
        let expired = match self.entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    /// Drop all entries unconditionally.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
