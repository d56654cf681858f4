//! Dump file contents.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Point-in-time copy of the registry with resolved values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpSnapshot {
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Backend the values were read from
    pub backend: String,
    pub total_keys: usize,
    pub entries: BTreeMap<String, DumpedEntry>,
}

/// One key in a [`DumpSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpedEntry {
    pub value: Value,
    /// Timeout in seconds, 0 = no expiration
    pub timeout: u64,
    pub inserted_at: DateTime<Utc>,
}

/// Outcome of a committed dump.
#[derive(Debug, Clone, Serialize)]
pub struct DumpReport {
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
    /// Entries written
    pub entries: usize,
    /// Tracked keys left out because their value was gone or unreadable
    pub skipped: usize,
}

/// Outcome of a restore.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    /// Timestamp of the snapshot, None when no dump file existed
    pub snapshot_timestamp: Option<DateTime<Utc>>,
    pub restored: usize,
    /// Entries the store still held; tracked again, value left as is
    pub live: usize,
    /// Entries whose timeout elapsed before the restore
    pub expired: usize,
    /// Entries the store refused
    pub failed: usize,
}
