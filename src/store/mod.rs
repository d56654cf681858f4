//! Value Store Module
//!
//! The backend that actually holds cached bytes. It expires values on its
//! own but cannot enumerate keys, which is why the registry exists.

mod memcached;
mod memory;

#[cfg(test)]
pub(crate) mod testing;

pub use memcached::MemcachedStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// Pass-through key/value backend with native TTL support.
///
/// Values are opaque bytes here; encoding belongs to the cache facade.
/// A `timeout` of 0 means the value never expires.
pub trait ValueStore: Send + Sync {
    /// Short backend name reported in stats and dump metadata.
    fn name(&self) -> &'static str;

    /// Reads a value, `None` when missing or expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes a value with the given timeout in seconds.
    fn set(&self, key: &str, value: &[u8], timeout: u64) -> Result<()>;

    /// Removes a value, returning whether it existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Re-applies a timeout to an existing value, returning whether it existed.
    fn touch(&self, key: &str, timeout: u64) -> Result<bool>;

    /// Drops every value in the store.
    fn flush(&self) -> Result<()>;
}
