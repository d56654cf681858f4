//! Tracked Cache - key tracking on top of a memcached-style value store
//!
//! The value store expires values on its own but cannot list its keys. This
//! crate keeps a bounded registry of written keys next to it, which enables
//! regex pattern operations, atomic JSON dumps with restore, and a periodic
//! auto-dump task.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
pub mod service;
pub mod store;
pub mod tasks;
pub mod util;

pub use cache::TrackedCache;
pub use config::{Backend, Config};
pub use error::{CacheError, Result};
pub use service::CacheService;
pub use store::{MemcachedStore, MemoryStore, ValueStore};
pub use tasks::{AutoDumpScheduler, SchedulerState};
