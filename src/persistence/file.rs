//! Atomic dump file handling.
//!
//! A dump is written next to its final path as `<dump>.tmp`, parsed back,
//! then swapped in by rename. The previous dump is parked at `<dump>.backup`
//! for the duration of the swap. Anything failing before the commit rename
//! leaves the previous dump as it was.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::persistence::DumpSnapshot;

/// Location of the on-disk snapshot and its sidecar files.
#[derive(Debug, Clone)]
pub struct DumpFile {
    path: PathBuf,
}

impl DumpFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch file in the same directory, so the commit rename stays on one filesystem.
    pub fn temp_path(&self) -> PathBuf {
        self.with_suffix(".tmp")
    }

    pub fn backup_path(&self) -> PathBuf {
        self.with_suffix(".backup")
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    }

    // == Write ==
    /// Serializes `snapshot` and commits it atomically.
    pub fn write(&self, snapshot: &DumpSnapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CacheError::dump("serialize", &self.path, e))?;
        self.commit(&bytes)
    }

    /// Runs the temp/validate/backup/rename protocol for already-encoded bytes.
    pub(crate) fn commit(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CacheError::dump("create directory", parent, e))?;
        }

        let temp = self.temp_path();
        if let Err(e) = write_synced(&temp, bytes) {
            remove_quietly(&temp);
            return Err(CacheError::dump("write temp file", &temp, e));
        }

        if let Err(e) = read_snapshot(&temp) {
            remove_quietly(&temp);
            return Err(CacheError::dump("validate temp file", &temp, e));
        }

        let backup = self.backup_path();
        let had_previous = match fs::rename(&self.path, &backup) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                remove_quietly(&temp);
                return Err(CacheError::dump("back up previous dump", &self.path, e));
            }
        };

        // Commit point
        if let Err(e) = fs::rename(&temp, &self.path) {
            if had_previous {
                if let Err(restore_err) = fs::rename(&backup, &self.path) {
                    warn!(
                        backup = %backup.display(),
                        error = %restore_err,
                        "Could not move previous dump back into place"
                    );
                }
            }
            remove_quietly(&temp);
            return Err(CacheError::dump("commit rename", &self.path, e));
        }

        // Also drops a backup left behind by an earlier crash
        match fs::remove_file(&backup) {
            Ok(()) if !had_previous => debug!(backup = %backup.display(), "Removed stale dump backup"),
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(backup = %backup.display(), error = %e, "Failed to remove dump backup"),
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "Dump committed");
        Ok(())
    }

    // == Load ==
    /// Reads the committed snapshot, `None` if no dump exists yet.
    ///
    /// Falls back to the backup when the main file is missing, which only
    /// happens if a previous process died between the two renames. Every
    /// committed write removes the backup, so a fallback never picks up a
    /// backup older than the last commit.
    pub fn load(&self) -> Result<Option<DumpSnapshot>> {
        for candidate in [self.path.clone(), self.backup_path()] {
            match read_snapshot(&candidate) {
                Ok(snapshot) => {
                    if candidate != self.path {
                        warn!(
                            backup = %candidate.display(),
                            snapshot_at = %snapshot.timestamp,
                            "Dump missing, loaded backup instead"
                        );
                    }
                    return Ok(Some(snapshot));
                }
                Err(ReadError::Io(e)) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(CacheError::Restore {
                        path: candidate,
                        message: e.to_string(),
                    })
                }
            }
        }
        Ok(None)
    }
}

#[derive(Debug, thiserror::Error)]
enum ReadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("not a valid dump: {0}")]
    Parse(#[from] serde_json::Error),
}

fn read_snapshot(path: &Path) -> std::result::Result<DumpSnapshot, ReadError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp dump"),
    }
}
