//! Time helpers shared by the store and the registry.

use chrono::{DateTime, Utc};

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Seconds left before `inserted_at + timeout`, `None` once that moment passed.
///
/// A timeout of 0 never expires and yields `Some(0)`, which stores read as
/// "no expiry" as well.
pub fn remaining_timeout(inserted_at: DateTime<Utc>, timeout: u64, now: DateTime<Utc>) -> Option<u64> {
    if timeout == 0 {
        return Some(0);
    }
    let elapsed_ms = (now - inserted_at).num_milliseconds().max(0) as u64;
    let timeout_ms = timeout.saturating_mul(1000);
    if elapsed_ms >= timeout_ms {
        return None;
    }
    // Round up so a value with 200ms left is not stored as "never expires"
    Some((timeout_ms - elapsed_ms).div_ceil(1000))
}
