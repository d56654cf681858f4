//! Result DTOs returned to the web layer
//!
//! Everything here serializes straight into a response body.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Snapshot returned by `get_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Number of tracked keys
    pub size: usize,
    /// Registry cap
    pub max_size: usize,
    /// Tracked keys, oldest insertion first
    pub keys: Vec<String>,
    /// Whether the auto-dump loop is running
    pub auto_dump_enabled: bool,
    /// Configured auto-dump interval in seconds
    pub auto_dump_interval: u64,
    /// Dump file location
    pub dump_file: String,
    /// Value store backend name
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

/// Result of `get_pattern_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct PatternStats {
    /// The pattern as given
    pub pattern: String,
    /// Tracked keys matching the pattern
    pub total_matching_keys: usize,
    /// Matches whose value still resolves
    pub active_keys: usize,
    /// Matches known to the registry only
    pub expired_keys: usize,
    pub matching_keys: Vec<String>,
    pub active_values: HashMap<String, Value>,
}

impl PatternStats {
    /// Partitions `matching_keys` by whether they appear in `active_values`.
    pub fn new(
        pattern: impl Into<String>,
        matching_keys: Vec<String>,
        active_values: HashMap<String, Value>,
    ) -> Self {
        let total_matching_keys = matching_keys.len();
        let active_keys = active_values.len();
        Self {
            pattern: pattern.into(),
            total_matching_keys,
            active_keys,
            expired_keys: total_matching_keys.saturating_sub(active_keys),
            matching_keys,
            active_values,
        }
    }
}
