//! Pattern-based bulk operations.
//!
//! Each operation copies the key list under the registry lock and then works
//! without it. Keys deleted or refreshed concurrently may still show up in a
//! scan; per-key failures leave that key out of the result.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{filter_keys, KeyPattern, TrackedCache};
use crate::error::Result;
use crate::models::PatternStats;

impl TrackedCache {
    /// Tracked keys in which `pattern` occurs, oldest insertion first.
    pub fn get_keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = KeyPattern::compile(pattern)?;
        Ok(self.matching_keys(&pattern))
    }

    /// Values of matching keys. Expired or unreadable keys are left out.
    pub fn get_values_by_pattern(&self, pattern: &str) -> Result<HashMap<String, Value>> {
        let pattern = KeyPattern::compile(pattern)?;
        let keys = self.matching_keys(&pattern);
        Ok(self.resolve_values(&keys))
    }

    /// Deletes matching keys, returning how many were removed.
    pub fn delete_keys_by_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::compile(pattern)?;
        let mut deleted = 0;
        for key in self.matching_keys(&pattern) {
            match self.delete(&key) {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(err) => warn!(key = %key, error = %err, "Pattern delete skipped key"),
            }
        }
        debug!(pattern = pattern.as_str(), deleted, "Deleted keys by pattern");
        Ok(deleted)
    }

    /// Re-applies `timeout` to matching keys, returning how many still resolved.
    pub fn refresh_keys_by_pattern(&self, pattern: &str, timeout: u64) -> Result<usize> {
        let pattern = KeyPattern::compile(pattern)?;
        let mut refreshed = 0;
        for key in self.matching_keys(&pattern) {
            match self.refresh(&key, timeout) {
                Ok(true) => refreshed += 1,
                Ok(false) => {}
                Err(err) => warn!(key = %key, error = %err, "Pattern refresh skipped key"),
            }
        }
        debug!(pattern = pattern.as_str(), refreshed, "Refreshed keys by pattern");
        Ok(refreshed)
    }

    /// Splits matching keys into those that still resolve and those that don't.
    pub fn get_pattern_stats(&self, pattern: &str) -> Result<PatternStats> {
        let compiled = KeyPattern::compile(pattern)?;
        let keys = self.matching_keys(&compiled);
        let values = self.resolve_values(&keys);
        Ok(PatternStats::new(pattern, keys, values))
    }

    // == Namespaces ==
    /// Pattern stats for keys of the form `<namespace>:...`.
    pub fn get_namespace_stats(&self, namespace: &str) -> Result<PatternStats> {
        self.get_pattern_stats(&namespace_pattern(namespace))
    }

    /// Deletes every key of the form `<namespace>:...`.
    pub fn clear_namespace(&self, namespace: &str) -> Result<usize> {
        self.delete_keys_by_pattern(&namespace_pattern(namespace))
    }

    fn matching_keys(&self, pattern: &KeyPattern) -> Vec<String> {
        let keys = self.get_all_keys();
        filter_keys(pattern, &keys)
    }

    fn resolve_values(&self, keys: &[String]) -> HashMap<String, Value> {
        let mut values = HashMap::with_capacity(keys.len());
        for key in keys {
            match self.get::<Value>(key) {
                Ok(Some(value)) => {
                    values.insert(key.clone(), value);
                }
                Ok(None) => {}
                Err(err) => debug!(key = %key, error = %err, "Pattern read skipped key"),
            }
        }
        values
    }
}

fn namespace_pattern(namespace: &str) -> String {
    format!("^{}:", regex::escape(namespace))
}
