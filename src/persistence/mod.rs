//! Persistence Module
//!
//! Snapshot types and the atomic on-disk dump format.

mod file;
mod snapshot;

pub use file::DumpFile;
pub use snapshot::{DumpReport, DumpSnapshot, DumpedEntry, RestoreReport};
