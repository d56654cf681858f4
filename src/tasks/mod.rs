//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is open.
//!
//! # Tasks
//! - Auto-dump: writes the cache to its dump file at a configurable interval

mod auto_dump;

pub use auto_dump::{AutoDumpScheduler, SchedulerState};
