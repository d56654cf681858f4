//! Cache Module
//!
//! Key-tracking facade over a [`ValueStore`](crate::store::ValueStore):
//! registry, pattern operations and dump/restore.

mod bulk;
mod codec;
mod entry;
mod persist;
mod registry;
mod stats;
mod tracked;

pub mod pattern;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use pattern::{filter_keys, KeyPattern};
pub use registry::KeyRegistry;
pub use stats::CacheCounters;
pub use tracked::TrackedCache;

// == Public Constants ==
/// Maximum allowed key length in bytes (memcached protocol limit)
pub const MAX_KEY_LENGTH: usize = 250;

/// Maximum allowed encoded value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
