//! Cache Entry Module
//!
//! Registry record for one tracked key. The value itself lives in the store.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::util::remaining_timeout;

// == Cache Entry ==
/// Tracking metadata for a key written through the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// The tracked key
    pub key: String,
    /// When the key was last written or refreshed
    pub inserted_at: DateTime<Utc>,
    /// Timeout in seconds, 0 = no expiration
    pub timeout: u64,
    /// Bumped on every write so reconciliation can tell entries apart
    #[serde(skip)]
    pub(crate) revision: u64,
}

impl CacheEntry {
    pub(crate) fn new(key: String, inserted_at: DateTime<Utc>, timeout: u64, revision: u64) -> Self {
        Self {
            key,
            inserted_at,
            timeout,
            revision,
        }
    }

    // == Expires At ==
    /// Moment the store is expected to drop the value, None = never.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.timeout == 0 {
            return None;
        }
        let secs = i64::try_from(self.timeout).unwrap_or(i64::MAX);
        Duration::try_seconds(secs).and_then(|d| self.inserted_at.checked_add_signed(d))
    }

    // == Is Expired ==
    /// Whether the registry expects the value to be gone at `now`.
    ///
    /// The store is authoritative; this is only the registry's estimate.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        remaining_timeout(self.inserted_at, self.timeout, now).is_none()
    }
}
