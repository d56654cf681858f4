//! Key Registry Module
//!
//! Tracks every key written through the cache, since the value store cannot
//! list its own keys. Capacity is enforced by evicting in insertion order.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::cache::CacheEntry;

// == Key Registry ==
/// Bounded set of tracked keys.
///
/// Insertion order is kept in a VecDeque where:
/// - Front = oldest insertion (next to evict)
/// - Back = newest insertion
///
/// Overwrites and refreshes re-stamp the entry and move it to the back.
/// Reads never reorder, so this is insertion-order eviction, not LRU.
#[derive(Debug)]
pub struct KeyRegistry {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    max_size: usize,
    /// Bumped by every clear
    generation: u64,
    next_revision: u64,
}

impl KeyRegistry {
    // == Constructor ==
    /// Creates an empty registry holding at most `max_size` keys (minimum 1).
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size: max_size.max(1),
            generation: 0,
            next_revision: 0,
        }
    }

    // == Insert ==
    /// Tracks `key` as written now with `timeout` seconds.
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn insert(&mut self, key: &str, timeout: u64) -> Option<CacheEntry> {
        self.insert_at(key, Utc::now(), timeout)
    }

    /// Tracks `key` with an explicit insertion time (used by restore).
    pub fn insert_at(
        &mut self,
        key: &str,
        inserted_at: DateTime<Utc>,
        timeout: u64,
    ) -> Option<CacheEntry> {
        let mut evicted = None;
        if self.entries.contains_key(key) {
            self.unlink(key);
        } else if self.entries.len() >= self.max_size {
            evicted = self.evict_oldest();
        }

        let revision = self.bump_revision();
        self.entries.insert(
            key.to_string(),
            CacheEntry::new(key.to_string(), inserted_at, timeout, revision),
        );
        self.order.push_back(key.to_string());
        evicted
    }

    // == Touch ==
    /// Re-stamps a tracked key with a new timeout. Returns false if untracked.
    pub fn touch(&mut self, key: &str, timeout: u64) -> bool {
        if !self.entries.contains_key(key) {
            return false;
        }
        self.insert(key, timeout);
        true
    }

    // == Remove ==
    /// Stops tracking `key`.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key)?;
        self.unlink(key);
        Some(removed)
    }

    /// Removes `key` only if it was not rewritten since `revision` was read.
    pub fn remove_if_revision(&mut self, key: &str, revision: u64) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.revision == revision => self.remove(key).is_some(),
            _ => false,
        }
    }

    pub fn revision_of(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.revision)
    }

    // == Clear ==
    /// Forgets every key and starts a new generation. Returns the count removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        self.generation += 1;
        count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // == Lookups ==
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Tracked keys, oldest insertion first.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    /// Tracked entries, oldest insertion first.
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn evict_oldest(&mut self) -> Option<CacheEntry> {
        let oldest = self.order.pop_front()?;
        self.entries.remove(&oldest)
    }

    fn unlink(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    fn bump_revision(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_registry_new() {
        let registry = KeyRegistry::new(10);
        assert!(registry.is_empty());
        assert_eq!(registry.max_size(), 10);
        assert_eq!(registry.generation(), 0);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut registry = KeyRegistry::new(0);
        registry.insert("a", 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insert_keeps_insertion_order() {
        let mut registry = KeyRegistry::new(10);
        registry.insert("a", 0);
        registry.insert("b", 0);
        registry.insert("c", 0);

        assert_eq!(registry.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_overflow_evicts_oldest_insertion() {
        let mut registry = KeyRegistry::new(3);
        registry.insert("a", 0);
        registry.insert("b", 0);
        registry.insert("c", 0);

        let evicted = registry.insert("d", 0).expect("should evict");

        assert_eq!(evicted.key, "a");
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.keys(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_overwrite_moves_key_to_newest() {
        let mut registry = KeyRegistry::new(3);
        registry.insert("a", 0);
        registry.insert("b", 0);
        registry.insert("c", 0);

        // Overwriting "a" must not evict and must make "b" the oldest
        assert!(registry.insert("a", 30).is_none());
        assert_eq!(registry.keys(), vec!["b", "c", "a"]);
        assert_eq!(registry.get("a").unwrap().timeout, 30);

        let evicted = registry.insert("d", 0).unwrap();
        assert_eq!(evicted.key, "b");
    }

    #[test]
    fn test_touch_restamps_tracked_key_only() {
        let mut registry = KeyRegistry::new(10);
        let old = Utc::now() - Duration::hours(1);
        registry.insert_at("a", old, 60);
        registry.insert("b", 60);

        assert!(registry.touch("a", 120));
        let entry = registry.get("a").unwrap();
        assert_eq!(entry.timeout, 120);
        assert!(entry.inserted_at > old);
        assert_eq!(registry.keys(), vec!["b", "a"]);

        assert!(!registry.touch("missing", 120));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_remove() {
        let mut registry = KeyRegistry::new(10);
        registry.insert("a", 0);
        registry.insert("b", 0);

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert_eq!(registry.keys(), vec!["b"]);
    }

    #[test]
    fn test_remove_if_revision_skips_rewritten_entry() {
        let mut registry = KeyRegistry::new(10);
        registry.insert("a", 0);
        let seen = registry.revision_of("a").unwrap();

        // Concurrent writer re-sets the key
        registry.insert("a", 0);

        assert!(!registry.remove_if_revision("a", seen));
        assert!(registry.contains("a"));

        let current = registry.revision_of("a").unwrap();
        assert!(registry.remove_if_revision("a", current));
        assert!(!registry.contains("a"));
    }

    #[test]
    fn test_clear_bumps_generation() {
        let mut registry = KeyRegistry::new(10);
        registry.insert("a", 0);
        registry.insert("b", 0);

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
        assert!(registry.keys().is_empty());
        assert_eq!(registry.generation(), 1);
    }

    #[test]
    fn test_entries_follow_order() {
        let mut registry = KeyRegistry::new(10);
        registry.insert("x", 5);
        registry.insert("y", 0);

        let entries = registry.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "x");
        assert_eq!(entries[0].timeout, 5);
        assert_eq!(entries[1].key, "y");
    }
}
