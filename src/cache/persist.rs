//! Dump and restore for [`TrackedCache`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{codec, TrackedCache};
use crate::error::{CacheError, Result};
use crate::persistence::{DumpReport, DumpSnapshot, DumpedEntry, RestoreReport};
use crate::util::remaining_timeout;

impl TrackedCache {
    // == Dump ==
    /// Writes a snapshot of every resolvable tracked key to the dump file.
    ///
    /// Blocks on store reads and file IO. The registry lock is only held
    /// while copying the entry list.
    pub fn dump_cache_sync(&self) -> Result<DumpReport> {
        let _dumping = self.dump_lock.lock();
        let tracked = self.registry.lock().entries();

        let mut entries = BTreeMap::new();
        let mut skipped = 0;
        for entry in tracked {
            // A store outage must not replace a good dump with an empty one
            let bytes = self
                .store
                .get(&entry.key)
                .map_err(|e| CacheError::dump("resolve values", self.dump_file.path(), e))?;
            let Some(bytes) = bytes else {
                skipped += 1;
                self.reconcile(&entry.key, entry.revision);
                continue;
            };
            match codec::decode::<Value>(&bytes) {
                Ok(value) => {
                    entries.insert(
                        entry.key,
                        DumpedEntry {
                            value,
                            timeout: entry.timeout,
                            inserted_at: entry.inserted_at,
                        },
                    );
                }
                Err(err) => {
                    skipped += 1;
                    warn!(key = %entry.key, error = %err, "Value not dumpable, skipped");
                }
            }
        }

        let snapshot = DumpSnapshot {
            timestamp: Utc::now(),
            backend: self.store.name().to_string(),
            total_keys: entries.len(),
            entries,
        };
        self.dump_file.write(&snapshot)?;

        info!(
            entries = snapshot.total_keys,
            skipped,
            "Cache dumped to {}",
            self.dump_file.path().display()
        );
        Ok(DumpReport {
            path: self.dump_file.path().to_path_buf(),
            timestamp: snapshot.timestamp,
            entries: snapshot.total_keys,
            skipped,
        })
    }

    /// Same as [`dump_cache_sync`](Self::dump_cache_sync) without blocking the
    /// async runtime; the work runs on the blocking pool.
    pub async fn dump_cache(self: &Arc<Self>) -> Result<DumpReport> {
        let cache = Arc::clone(self);
        tokio::task::spawn_blocking(move || cache.dump_cache_sync())
            .await
            .map_err(|e| CacheError::Internal(format!("dump task failed: {}", e)))?
    }

    // == Restore ==
    /// Re-populates store and registry from the dump file.
    ///
    /// Entries keep their original insertion time and timeout, and are
    /// written to the store with whatever lifetime they had left. Entries
    /// already past their timeout are dropped. A key the store still holds
    /// is tracked again without overwriting its live value.
    pub fn restore_from_dump(&self) -> Result<RestoreReport> {
        let Some(snapshot) = self.dump_file.load()? else {
            debug!(path = %self.dump_file.path().display(), "No dump file, starting fresh");
            return Ok(RestoreReport::default());
        };

        let mut report = RestoreReport {
            snapshot_timestamp: Some(snapshot.timestamp),
            ..RestoreReport::default()
        };
        let now = Utc::now();

        // Oldest first so registry order, and therefore eviction order, survives
        let mut entries: Vec<_> = snapshot.entries.into_iter().collect();
        entries.sort_by_key(|(_, entry)| entry.inserted_at);

        for (key, entry) in entries {
            let Some(remaining) = remaining_timeout(entry.inserted_at, entry.timeout, now) else {
                report.expired += 1;
                continue;
            };
            match self.restore_entry(&key, &entry, remaining) {
                Ok(RestoredAs::Written) => report.restored += 1,
                Ok(RestoredAs::Live) => report.live += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(key = %key, error = %err, "Failed to restore key");
                }
            }
        }

        Ok(report)
    }

    fn restore_entry(&self, key: &str, entry: &DumpedEntry, remaining: u64) -> Result<RestoredAs> {
        let generation = self.registry.lock().generation();
        if self.store.get(key)?.is_some() {
            self.track_if_current(key, generation, entry.inserted_at, entry.timeout);
            return Ok(RestoredAs::Live);
        }
        let bytes = codec::encode(&entry.value)?;
        self.store_tracked(key, &bytes, entry.inserted_at, entry.timeout, remaining)?;
        Ok(RestoredAs::Written)
    }
}

enum RestoredAs {
    Written,
    /// Store already held a value, which was kept
    Live,
}
