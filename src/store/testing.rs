//! Value store doubles for exercising failure and interleaving paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use parking_lot::Mutex;

use crate::error::{CacheError, Result};
use crate::store::{MemoryStore, ValueStore};

// == Flaky Store ==
/// Memory store that can be switched off entirely or per key.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    pub(crate) inner: MemoryStore,
    down: AtomicBool,
    broken_keys: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every operation fails while down.
    pub(crate) fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Operations on `key` fail until the store is rebuilt.
    pub(crate) fn break_key(&self, key: &str) {
        self.broken_keys.lock().insert(key.to_string());
    }

    fn check(&self, operation: &str, key: &str) -> Result<()> {
        if self.down.load(Ordering::SeqCst) || self.broken_keys.lock().contains(key) {
            return Err(CacheError::Storage(format!("{} '{}': connection refused", operation, key)));
        }
        Ok(())
    }
}

impl ValueStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check("get", key)?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8], timeout: u64) -> Result<()> {
        self.check("set", key)?;
        self.inner.set(key, value, timeout)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.check("delete", key)?;
        self.inner.delete(key)
    }

    fn touch(&self, key: &str, timeout: u64) -> Result<bool> {
        self.check("touch", key)?;
        self.inner.touch(key, timeout)
    }

    fn flush(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(CacheError::Storage("flush: connection refused".to_string()));
        }
        self.inner.flush()
    }
}

// == Gated Store ==
/// Memory store whose next `delete` parks after removing the value.
///
/// The test thread meets the store at `gate` once the delete is parked and
/// again to let it continue.
#[derive(Debug)]
pub(crate) struct GatedStore {
    pub(crate) inner: MemoryStore,
    armed: AtomicBool,
    pub(crate) gate: Arc<Barrier>,
}

impl GatedStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            armed: AtomicBool::new(false),
            gate: Arc::new(Barrier::new(2)),
        }
    }

    pub(crate) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl ValueStore for GatedStore {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8], timeout: u64) -> Result<()> {
        self.inner.set(key, value, timeout)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let existed = self.inner.delete(key)?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.gate.wait();
            self.gate.wait();
        }
        Ok(existed)
    }

    fn touch(&self, key: &str, timeout: u64) -> Result<bool> {
        self.inner.touch(key, timeout)
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }
}
