//! Cache Store Module
//!
//! Expiring key-value store with lazy eviction on read and an explicit sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheEntry, CacheStats};
use crate::clock::{Clock, SystemClock};

// == Expiring Cache ==
/// In-memory cache with a per-entry TTL.
///
/// There is no size bound. Expired entries are dropped when they are read or
/// when [`ExpiringCache::cleanup_expired`] runs; nothing else removes them.
#[derive(Debug)]
pub struct ExpiringCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
    /// Time source for expiry checks
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ExpiringCache<V> {
    // == Constructor ==
    /// Creates an empty cache on the system clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Creates an empty cache on the given clock.
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            default_ttl,
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Set ==
    /// Stores a value with an absolute expiry of `now + ttl`.
    ///
    /// Overwriting an existing key replaces the value and resets its TTL.
    /// `None` uses the default TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        self.entries.insert(key.into(), entry);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Returns the value if present and not expired.
    ///
    /// An expired entry is removed as a side effect and counted as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now();
        if self.evict_if_expired(key, now) {
            self.stats.record_miss();
            return None;
        }

        match self.entries.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Same expiry check as [`ExpiringCache::get`] without cloning the value.
    ///
    /// Does not move the hit/miss counters.
    pub fn has(&mut self, key: &str) -> bool {
        let now = self.clock.now();
        if self.evict_if_expired(key, now) {
            return false;
        }
        self.entries.contains_key(key)
    }

    // == Delete ==
    /// Removes a key unconditionally. Returns whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
    }

    // == Keys ==
    /// Returns the keys of all live entries.
    pub fn keys(&self) -> Vec<String> {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Batch Operations ==
    /// Stores every item with the same TTL. Not atomic across entries.
    pub fn set_multiple<K, I>(&mut self, items: I, ttl: Option<Duration>)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in items {
            self.set(key, value, ttl);
        }
    }

    /// Looks up every key in order, with the same semantics as `get`.
    pub fn get_multiple<S: AsRef<str>>(&mut self, keys: &[S]) -> Vec<Option<V>> {
        keys.iter().map(|key| self.get(key.as_ref())).collect()
    }

    // == Remaining TTL ==
    /// Remaining lifetime of a live entry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.ttl_remaining(now).to_std().ok())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let count = before - self.entries.len();
        self.stats.record_expirations(count);
        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Memory Usage ==
    /// Rough footprint in bytes: key lengths plus each value's JSON encoding.
    /// Expired entries still held are counted.
    pub fn approximate_size_bytes(&self) -> usize
    where
        V: Serialize,
    {
        self.entries
            .iter()
            .map(|(key, entry)| {
                key.len() + serde_json::to_vec(&entry.value).map_or(0, |bytes| bytes.len())
            })
            .sum()
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_if_expired(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now));

        if expired {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
        }
        expired
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock() -> (ExpiringCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = ExpiringCache::with_clock(Duration::from_secs(300), clock.clone());
        (cache, clock)
    }

    fn step(clock: &ManualClock, duration: Duration) {
        clock.advance(chrono::Duration::from_std(duration).unwrap());
    }

    #[test]
    fn test_store_new() {
        let store: ExpiringCache<String> = ExpiringCache::new(Duration::from_secs(300));
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.default_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_store_set_and_get() {
        let (mut store, _) = cache_with_clock();

        store.set("key1", "value1".to_string(), None);

        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let (mut store, _) = cache_with_clock();
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_delete() {
        let (mut store, _) = cache_with_clock();

        store.set("key1", "value1".to_string(), None);
        assert!(store.delete("key1"));

        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_delete_nonexistent() {
        let (mut store, _) = cache_with_clock();
        assert!(!store.delete("nonexistent"));
    }

    #[test]
    fn test_store_overwrite_resets_ttl() {
        let (mut store, clock) = cache_with_clock();

        store.set("key1", "value1".to_string(), Some(Duration::from_secs(10)));
        step(&clock, Duration::from_secs(8));
        store.set("key1", "value2".to_string(), Some(Duration::from_secs(10)));
        step(&clock, Duration::from_secs(8));

        assert_eq!(store.get("key1"), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration_is_lazy() {
        let (mut store, clock) = cache_with_clock();

        store.set("key1", "value1".to_string(), Some(Duration::from_secs(1)));
        assert!(store.get("key1").is_some());

        step(&clock, Duration::from_millis(1001));

        // Still stored until something reads it
        assert_eq!(store.len(), 1);
        assert!(store.keys().is_empty());

        assert_eq!(store.get("key1"), None);
        assert_eq!(store.len(), 0);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_default_ttl_applies() {
        let (mut store, clock) = cache_with_clock();

        store.set("key1", "value1".to_string(), None);
        step(&clock, Duration::from_secs(299));
        assert!(store.has("key1"));

        step(&clock, Duration::from_secs(2));
        assert!(!store.has("key1"));
    }

    #[test]
    fn test_store_has_evicts_without_counting() {
        let (mut store, clock) = cache_with_clock();

        store.set("key1", "value1".to_string(), Some(Duration::from_secs(1)));
        assert!(store.has("key1"));

        step(&clock, Duration::from_secs(2));
        assert!(!store.has("key1"));
        assert!(store.is_empty());

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_store_clear() {
        let (mut store, _) = cache_with_clock();

        store.set("a", "1".to_string(), None);
        store.set("b", "2".to_string(), None);
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.stats().total_entries, 0);
    }

    #[test]
    fn test_store_batch_operations() {
        let (mut store, clock) = cache_with_clock();

        store.set_multiple(
            vec![("a", "1".to_string()), ("b", "2".to_string())],
            Some(Duration::from_secs(5)),
        );
        store.set("c", "3".to_string(), Some(Duration::from_secs(60)));

        let values = store.get_multiple(&["a", "missing", "c"]);
        assert_eq!(
            values,
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );

        step(&clock, Duration::from_secs(6));
        let values = store.get_multiple(&["a", "b", "c"]);
        assert_eq!(values, vec![None, None, Some("3".to_string())]);
    }

    #[test]
    fn test_store_ttl_remaining() {
        let (mut store, clock) = cache_with_clock();

        store.set("key1", "v".to_string(), Some(Duration::from_secs(10)));
        step(&clock, Duration::from_secs(4));

        assert_eq!(store.ttl_remaining("key1"), Some(Duration::from_secs(6)));
        assert_eq!(store.ttl_remaining("missing"), None);

        step(&clock, Duration::from_secs(7));
        assert_eq!(store.ttl_remaining("key1"), None);
    }

    #[test]
    fn test_store_stats() {
        let (mut store, _) = cache_with_clock();

        store.set("key1", "value1".to_string(), None);
        store.get("key1"); // hit
        store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let (mut store, clock) = cache_with_clock();

        store.set("key1", "value1".to_string(), Some(Duration::from_secs(1)));
        store.set("key2", "value2".to_string(), Some(Duration::from_secs(10)));

        step(&clock, Duration::from_secs(2));

        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key2"), Some("value2".to_string()));
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_approximate_size_bytes() {
        let (mut store, _) = cache_with_clock();
        assert_eq!(store.approximate_size_bytes(), 0);

        // "ab" + "\"xyz\"" and "c" + "\"\""
        store.set("ab", "xyz".to_string(), None);
        store.set("c", String::new(), None);
        assert_eq!(store.approximate_size_bytes(), 2 + 5 + 1 + 2);

        store.delete("ab");
        assert_eq!(store.approximate_size_bytes(), 3);
    }
}
