//! TTL cache map with lazy expiry

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

struct CacheEntry<V> {
   value: V,
   created: Instant,
   ttl: Duration,
}

impl<V> CacheEntry<V> {
   fn is_expired(&self) -> bool {
      self.created.elapsed() > self.ttl
   }
}

/// In-memory cache with a per-entry time-to-live.
///
/// Values are handed out by clone, so the same cached value may be shared
/// between callers; treat returned values as read-only. Wrapping large
/// results in an `Arc` keeps the clone cheap.
///
/// All operations are synchronous map accesses under a mutex. Nothing here
/// suspends, and the lock is never held across anything that could.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tracknotes_cache::TtlCache;
///
/// let cache: TtlCache<&str> = TtlCache::new();
/// cache.set("threads-all-1", "page one", Duration::from_secs(300));
///
/// assert_eq!(cache.get("threads-all-1"), Some("page one"));
/// cache.invalidate("threads");
/// assert_eq!(cache.get("threads-all-1"), None);
/// ```
pub struct TtlCache<V> {
   entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
   /// Create an empty cache.
   pub fn new() -> Self {
      Self {
         entries: Mutex::new(HashMap::new()),
      }
   }

   /// Look up `key`, treating an expired entry exactly like a miss.
   ///
   /// Expiry is lazy: the expired entry is removed here, on lookup, rather
   /// than by a background sweep.
   pub fn get(&self, key: &str) -> Option<V> {
      let mut entries = self.lock_entries();

      match entries.get(key) {
         Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
         Some(_) => {}
         None => return None,
      }

      // The entry exists but is past its TTL: drop it and report a miss
      entries.remove(key);
      trace!(key, "cache entry expired on lookup");
      None
   }

   /// Insert or replace the entry for `key` with a fresh timestamp.
   ///
   /// The TTL is per-entry: different query families can pick different
   /// freshness windows at call time.
   pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
      let key = key.into();
      trace!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache entry stored");

      self.lock_entries().insert(
         key,
         CacheEntry {
            value,
            created: Instant::now(),
            ttl,
         },
      );
   }

   /// Remove every entry whose key equals or starts with `prefix`.
   ///
   /// Returns the number of entries removed. Called after a write that makes
   /// a family of cached listings stale; the shared-prefix convention clears
   /// all paginated and filtered variants in one call.
   pub fn invalidate(&self, prefix: &str) -> usize {
      let mut entries = self.lock_entries();
      let before = entries.len();
      entries.retain(|key, _| !key.starts_with(prefix));
      let removed = before - entries.len();

      if removed > 0 {
         debug!(prefix, removed, "cache entries invalidated");
      }

      removed
   }

   /// Drop every expired entry, reclaiming memory from entries that were
   /// set but never read again. Purely an optimization: `get` already treats
   /// expired entries as misses.
   pub fn purge_expired(&self) -> usize {
      let mut entries = self.lock_entries();
      let before = entries.len();
      entries.retain(|_, entry| !entry.is_expired());
      let removed = before - entries.len();

      if removed > 0 {
         trace!(removed, "expired cache entries purged");
      }

      removed
   }

   /// Number of stored entries, counting entries that have expired but have
   /// not been purged or looked up yet.
   pub fn len(&self) -> usize {
      self.lock_entries().len()
   }

   /// Whether the cache holds no entries at all.
   pub fn is_empty(&self) -> bool {
      self.lock_entries().is_empty()
   }

   fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
      self.entries.lock().expect("cache lock poisoned")
   }
}

impl<V: Clone> Default for TtlCache<V> {
   fn default() -> Self {
      Self::new()
   }
}
