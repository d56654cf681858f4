//! Tracked Cache
//!
//! Facade combining a value store with the key registry. Values go to the
//! store, bookkeeping goes to the registry, and the registry only changes
//! after the store accepted the write.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::{codec, CacheCounters, CacheEntry, KeyRegistry, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::config::{Backend, Config};
use crate::error::{CacheError, Result};
use crate::models::CacheStats;
use crate::persistence::DumpFile;
use crate::store::{MemcachedStore, MemoryStore, ValueStore};
use crate::tasks::SchedulerState;

// == Tracked Cache ==
/// Key-tracking cache over a [`ValueStore`].
///
/// # Concurrency
/// One mutex guards the registry. `clear` holds it across the store flush
/// and the registry wipe and starts a new registry generation. A `set` that
/// began before a clear and finishes after it loses: its value is deleted
/// and the key is not tracked.
pub struct TrackedCache {
    pub(super) store: Arc<dyn ValueStore>,
    pub(super) registry: Mutex<KeyRegistry>,
    pub(super) counters: CacheCounters,
    pub(super) dump_file: DumpFile,
    /// Serializes dumps so two writers never share the temp file
    pub(super) dump_lock: Mutex<()>,
}

impl TrackedCache {
    // == Constructor ==
    /// Creates an empty cache over `store`.
    ///
    /// # Arguments
    /// * `store` - Backend holding the values
    /// * `max_size` - Maximum number of tracked keys
    /// * `dump_path` - Where snapshots are written and restored from
    pub fn new(store: Arc<dyn ValueStore>, max_size: usize, dump_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            registry: Mutex::new(KeyRegistry::new(max_size)),
            counters: CacheCounters::new(),
            dump_file: DumpFile::new(dump_path),
            dump_lock: Mutex::new(()),
        }
    }

    /// Connects the configured backend and optionally restores the last dump.
    ///
    /// A corrupt dump is logged and the cache starts empty.
    pub fn open(config: &Config) -> Result<Self> {
        let store: Arc<dyn ValueStore> = match config.backend {
            Backend::Memcached => Arc::new(MemcachedStore::connect(&config.memcached_url())?),
            Backend::Memory => Arc::new(MemoryStore::new()),
        };
        let cache = Self::new(store, config.max_size, &config.dump_file);

        if config.restore_on_startup {
            match cache.restore_from_dump() {
                Ok(report) => info!(
                    restored = report.restored,
                    live = report.live,
                    expired = report.expired,
                    failed = report.failed,
                    "Cache restored from {}",
                    cache.dump_file.path().display()
                ),
                Err(err) => error!(error = %err, "Restore failed, starting with an empty cache"),
            }
        }

        Ok(cache)
    }

    // == Set ==
    /// Stores `value` under `key` for `timeout` seconds (0 = no expiry).
    ///
    /// Overwrites re-stamp the key as newest. A new key at capacity evicts
    /// the oldest-inserted key, value included.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, timeout: u64) -> Result<()> {
        validate_key(key)?;
        let bytes = codec::encode(value)?;
        if bytes.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }
        self.store_tracked(key, &bytes, Utc::now(), timeout, timeout)
    }

    /// Writes to the store, then tracks the key unless a clear overtook the write.
    pub(super) fn store_tracked(
        &self,
        key: &str,
        bytes: &[u8],
        inserted_at: DateTime<Utc>,
        timeout: u64,
        store_timeout: u64,
    ) -> Result<()> {
        let generation = self.registry.lock().generation();
        self.store.set(key, bytes, store_timeout)?;
        self.track_if_current(key, generation, inserted_at, timeout);
        Ok(())
    }

    /// Tracks a key whose value is already in the store.
    ///
    /// If a clear ran since `generation` was read, the value is dropped
    /// instead. Store IO happens after the registry lock is released.
    pub(super) fn track_if_current(
        &self,
        key: &str,
        generation: u64,
        inserted_at: DateTime<Utc>,
        timeout: u64,
    ) -> bool {
        let evicted = {
            let mut registry = self.registry.lock();
            if registry.generation() != generation {
                None
            } else {
                Some(self.track(&mut registry, key, inserted_at, timeout))
            }
        };

        match evicted {
            None => {
                if let Err(err) = self.store.delete(key) {
                    warn!(key, error = %err, "Failed to drop value written across a clear");
                }
                debug!(key, "Write lost to concurrent clear");
                false
            }
            Some(evicted) => {
                self.drop_evicted(evicted);
                true
            }
        }
    }

    /// Registers `key`, returning the entry evicted to make room.
    fn track(
        &self,
        registry: &mut KeyRegistry,
        key: &str,
        inserted_at: DateTime<Utc>,
        timeout: u64,
    ) -> Option<CacheEntry> {
        let evicted = registry.insert_at(key, inserted_at, timeout)?;
        self.counters.record_eviction();
        debug!(evicted = %evicted.key, "Registry full, evicted oldest key");
        Some(evicted)
    }

    /// Deletes the value of an evicted entry. Called without the registry lock.
    fn drop_evicted(&self, evicted: Option<CacheEntry>) {
        let Some(evicted) = evicted else {
            return;
        };
        if let Err(err) = self.store.delete(&evicted.key) {
            warn!(key = %evicted.key, error = %err, "Failed to delete evicted value");
        }
    }

    // == Get ==
    /// Reads `key`. A miss on a tracked key drops the stale registry entry.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => codec::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    pub(super) fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let seen = self.registry.lock().revision_of(key);
        match self.store.get(key)? {
            Some(bytes) => {
                self.counters.record_hit();
                Ok(Some(bytes))
            }
            None => {
                self.counters.record_miss();
                if let Some(revision) = seen {
                    self.reconcile(key, revision);
                }
                Ok(None)
            }
        }
    }

    /// Forgets `key` if nobody rewrote it since `revision` was observed.
    pub(super) fn reconcile(&self, key: &str, revision: u64) {
        if self.registry.lock().remove_if_revision(key, revision) {
            debug!(key, "Dropped registry entry for expired value");
        }
    }

    // == Delete ==
    /// Removes `key` from store and registry. Returns whether it was tracked.
    ///
    /// A `set` of the same key that lands while the store delete is in
    /// flight keeps its registry entry.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let seen = self.registry.lock().revision_of(key);
        self.store.delete(key)?;
        if let Some(revision) = seen {
            self.registry.lock().remove_if_revision(key, revision);
        }
        Ok(seen.is_some())
    }

    // == Refresh ==
    /// Re-applies `timeout` to `key`. Returns false once the value is gone.
    ///
    /// A value present in the store but not tracked is tracked again.
    pub fn refresh(&self, key: &str, timeout: u64) -> Result<bool> {
        let (seen, generation) = {
            let registry = self.registry.lock();
            (registry.revision_of(key), registry.generation())
        };

        if !self.store.touch(key, timeout)? {
            if let Some(revision) = seen {
                self.reconcile(key, revision);
            }
            return Ok(false);
        }

        let evicted = {
            let mut registry = self.registry.lock();
            if registry.generation() != generation {
                return Ok(false);
            }
            if registry.touch(key, timeout) {
                None
            } else {
                self.track(&mut registry, key, Utc::now(), timeout)
            }
        };
        self.drop_evicted(evicted);
        Ok(true)
    }

    // == Clear ==
    /// Flushes the store and forgets every key as one step.
    pub fn clear(&self) -> Result<()> {
        let mut registry = self.registry.lock();
        self.store.flush()?;
        let removed = registry.clear();
        info!(removed, "Cache cleared");
        Ok(())
    }

    // == Enumeration ==
    pub fn size(&self) -> usize {
        self.registry.lock().len()
    }

    /// Copy of the tracked keys, oldest insertion first.
    pub fn get_all_keys(&self) -> Vec<String> {
        self.registry.lock().keys()
    }

    /// Tracking metadata for `key`, if tracked.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.registry.lock().get(key).cloned()
    }

    pub fn max_size(&self) -> usize {
        self.registry.lock().max_size()
    }

    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn dump_path(&self) -> &std::path::Path {
        self.dump_file.path()
    }

    // == Stats ==
    /// Registry and counter snapshot, with auto-dump fields taken from `auto_dump`.
    pub fn stats(&self, auto_dump: &SchedulerState) -> CacheStats {
        let (size, max_size, keys) = {
            let registry = self.registry.lock();
            (registry.len(), registry.max_size(), registry.keys())
        };
        CacheStats {
            size,
            max_size,
            keys,
            auto_dump_enabled: auto_dump.enabled,
            auto_dump_interval: auto_dump.interval_seconds,
            dump_file: self.dump_file.path().display().to_string(),
            backend: self.store.name().to_string(),
            hits: self.counters.hits(),
            misses: self.counters.misses(),
            evictions: self.counters.evictions(),
            hit_rate: self.counters.hit_rate(),
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CacheError::InvalidRequest(
            "Key cannot contain whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}
