//! Result models handed to the web layer
//!
//! Plain serializable structs; the web layer owns routing and rendering.

pub mod responses;

pub use responses::{CacheStats, PatternStats};
