//! In-process value store with lazy TTL expiration.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::Result;
use crate::store::ValueStore;
use crate::util::current_timestamp_ms;

// == Stored Value ==
#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    expires_at: Option<u64>,
}

impl StoredValue {
    fn new(bytes: Vec<u8>, timeout: u64) -> Self {
        Self {
            bytes,
            expires_at: expiry_for(timeout),
        }
    }

    /// Expired once the current time reaches the expiration time.
    fn is_expired(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now >= expires)
    }
}

fn expiry_for(timeout: u64) -> Option<u64> {
    (timeout > 0).then(|| current_timestamp_ms().saturating_add(timeout.saturating_mul(1000)))
}

// == Memory Store ==
/// Value store kept in process memory.
///
/// Behaves like memcached for the operations the cache needs: values expire
/// on their own and there is no way to list keys through [`ValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values held, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut values = self.values.lock();
        let now = current_timestamp_ms();
        match values.get(key) {
            Some(stored) if stored.is_expired(now) => {
                values.remove(key);
                Ok(None)
            }
            Some(stored) => Ok(Some(stored.bytes.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8], timeout: u64) -> Result<()> {
        self.values
            .lock()
            .insert(key.to_string(), StoredValue::new(value.to_vec(), timeout));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut values = self.values.lock();
        let now = current_timestamp_ms();
        Ok(values
            .remove(key)
            .is_some_and(|stored| !stored.is_expired(now)))
    }

    fn touch(&self, key: &str, timeout: u64) -> Result<bool> {
        let mut values = self.values.lock();
        let now = current_timestamp_ms();
        match values.get_mut(key) {
            Some(stored) if stored.is_expired(now) => {
                values.remove(key);
                Ok(false)
            }
            Some(stored) => {
                stored.expires_at = expiry_for(timeout);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn flush(&self) -> Result<()> {
        self.values.lock().clear();
        Ok(())
    }
}
