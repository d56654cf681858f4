//! Cache Service
//!
//! Owns a [`TrackedCache`] and its auto-dump scheduler. This is the object a
//! web layer or the daemon holds on to.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{error, info};

use crate::cache::TrackedCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{CacheStats, PatternStats};
use crate::persistence::DumpReport;
use crate::tasks::{AutoDumpScheduler, SchedulerState};

/// Timeout used by [`CacheService::set_default`] unless configured otherwise.
const DEFAULT_TIMEOUT: u64 = 3600;

/// Key-tracking cache plus its periodic dump loop.
///
/// Must be created inside a tokio runtime; the scheduler spawns onto it.
pub struct CacheService {
    cache: Arc<TrackedCache>,
    scheduler: AutoDumpScheduler,
    default_timeout: u64,
}

impl CacheService {
    /// Opens the configured backend, restores the last dump if enabled and
    /// prepares (but does not start) auto-dump.
    pub fn open(config: &Config) -> Result<Self> {
        let cache = TrackedCache::open(config)?;
        let service = Self::new(Arc::new(cache), config.auto_dump_interval)?;
        Ok(service.with_default_timeout(config.default_timeout))
    }

    /// Wraps an existing cache.
    ///
    /// # Arguments
    /// * `cache` - The cache to manage
    /// * `auto_dump_interval` - Seconds between dumps, 0 disables
    pub fn new(cache: Arc<TrackedCache>, auto_dump_interval: u64) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| CacheError::Internal(format!("no tokio runtime: {}", e)))?;
        Ok(Self {
            scheduler: AutoDumpScheduler::new(Arc::clone(&cache), auto_dump_interval, runtime),
            cache,
            default_timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_default_timeout(mut self, timeout: u64) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<TrackedCache> {
        &self.cache
    }

    pub fn default_timeout(&self) -> u64 {
        self.default_timeout
    }

    // == Key Operations ==
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, timeout: u64) -> Result<()> {
        self.cache.set(key, value, timeout)
    }

    /// Stores `value` with the configured default timeout.
    pub fn set_default<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.cache.set(key, value, self.default_timeout)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.cache.get(key)
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        self.cache.delete(key)
    }

    pub fn refresh(&self, key: &str, timeout: u64) -> Result<bool> {
        self.cache.refresh(key, timeout)
    }

    pub fn clear(&self) -> Result<()> {
        self.cache.clear()
    }

    pub fn size(&self) -> usize {
        self.cache.size()
    }

    pub fn get_all_keys(&self) -> Vec<String> {
        self.cache.get_all_keys()
    }

    pub fn get_stats(&self) -> CacheStats {
        self.cache.stats(&self.scheduler.state())
    }

    // == Pattern Operations ==
    pub fn get_keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        self.cache.get_keys_by_pattern(pattern)
    }

    pub fn get_values_by_pattern(&self, pattern: &str) -> Result<HashMap<String, Value>> {
        self.cache.get_values_by_pattern(pattern)
    }

    pub fn delete_keys_by_pattern(&self, pattern: &str) -> Result<usize> {
        self.cache.delete_keys_by_pattern(pattern)
    }

    pub fn refresh_keys_by_pattern(&self, pattern: &str, timeout: u64) -> Result<usize> {
        self.cache.refresh_keys_by_pattern(pattern, timeout)
    }

    pub fn get_pattern_stats(&self, pattern: &str) -> Result<PatternStats> {
        self.cache.get_pattern_stats(pattern)
    }

    pub fn get_namespace_stats(&self, namespace: &str) -> Result<PatternStats> {
        self.cache.get_namespace_stats(namespace)
    }

    pub fn clear_namespace(&self, namespace: &str) -> Result<usize> {
        self.cache.clear_namespace(namespace)
    }

    // == Persistence ==
    pub async fn dump_cache(&self) -> Result<DumpReport> {
        self.cache.dump_cache().await
    }

    pub fn dump_cache_sync(&self) -> Result<DumpReport> {
        self.cache.dump_cache_sync()
    }

    // == Auto-Dump Control ==
    /// Returns whether auto-dump is running afterwards.
    pub fn start_auto_dump(&self) -> bool {
        self.scheduler.start()
    }

    /// Returns whether auto-dump was running.
    pub fn stop_auto_dump(&self) -> bool {
        self.scheduler.stop()
    }

    pub fn set_auto_dump_interval(&self, seconds: u64) {
        self.scheduler.set_interval(seconds)
    }

    pub fn auto_dump_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    // == Shutdown ==
    /// Stops auto-dump, waits for a running dump, then writes a final one.
    pub async fn shutdown(&self) -> Result<DumpReport> {
        self.scheduler.stop_and_wait().await;
        match self.cache.dump_cache().await {
            Ok(report) => {
                info!(entries = report.entries, "Final dump written");
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, "Final dump failed");
                Err(err)
            }
        }
    }
}
