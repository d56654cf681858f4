//! Memcached-backed value store.

use std::fmt;

use memcache::{Client, MemcacheError};

use crate::error::{CacheError, Result};
use crate::store::ValueStore;
use crate::util::current_timestamp_ms;

/// Memcached reads expirations above 30 days as absolute Unix timestamps.
const RELATIVE_EXPIRATION_LIMIT: u64 = 60 * 60 * 24 * 30;

// == Memcached Store ==
/// Value store talking to a memcached server through the `memcache` client.
pub struct MemcachedStore {
    client: Client,
    url: String,
}

impl MemcachedStore {
    /// Connects to `url`, e.g. `memcache://127.0.0.1:11211`.
    pub fn connect(url: &str) -> Result<Self> {
        let client = Client::connect(url)
            .map_err(|e| CacheError::Storage(format!("connect to {}: {}", url, e)))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for MemcachedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemcachedStore")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

fn storage_error(operation: &str, key: &str, err: MemcacheError) -> CacheError {
    CacheError::Storage(format!("{} '{}': {}", operation, key, err))
}

/// Converts a timeout in seconds into a memcached expiration field.
fn expiration(timeout: u64) -> u32 {
    if timeout <= RELATIVE_EXPIRATION_LIMIT {
        return timeout as u32;
    }
    let absolute = current_timestamp_ms() / 1000 + timeout;
    u32::try_from(absolute).unwrap_or(u32::MAX)
}

impl ValueStore for MemcachedStore {
    fn name(&self) -> &'static str {
        "memcached"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.client
            .get::<Vec<u8>>(key)
            .map_err(|e| storage_error("get", key, e))
    }

    fn set(&self, key: &str, value: &[u8], timeout: u64) -> Result<()> {
        self.client
            .set(key, value, expiration(timeout))
            .map_err(|e| storage_error("set", key, e))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.client
            .delete(key)
            .map_err(|e| storage_error("delete", key, e))
    }

    fn touch(&self, key: &str, timeout: u64) -> Result<bool> {
        self.client
            .touch(key, expiration(timeout))
            .map_err(|e| storage_error("touch", key, e))
    }

    fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .map_err(|e| CacheError::Storage(format!("flush {}: {}", self.url, e)))
    }
}
