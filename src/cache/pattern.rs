//! Pattern Engine
//!
//! Regex selection over a snapshot of tracked keys. Matching is an
//! unanchored search: `user:` selects `user:1` and `admin:user:7` alike.
//! Anchor with `^`/`$` for prefix or exact matches.

use regex::Regex;

use crate::error::{CacheError, Result};

/// Compiled key pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compiles `pattern`, failing with [`CacheError::Pattern`] if it is not a valid regex.
    pub fn compile(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| CacheError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern occurs anywhere in `key`.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

/// Keys from `keys` selected by `pattern`, order preserved.
pub fn filter_keys(pattern: &KeyPattern, keys: &[String]) -> Vec<String> {
    keys.iter()
        .filter(|key| pattern.matches(key))
        .cloned()
        .collect()
}
