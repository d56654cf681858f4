//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Which value store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Remote memcached server
    Memcached,
    /// In-process store, values are lost on exit
    Memory,
}

impl Backend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memcached" | "memcache" => Some(Backend::Memcached),
            "memory" | "mem" => Some(Backend::Memory),
            _ => None,
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the on-disk snapshot
    pub dump_file: PathBuf,
    /// Maximum number of tracked keys
    pub max_size: usize,
    /// Auto-dump interval in seconds, 0 disables
    pub auto_dump_interval: u64,
    /// Memcached host
    pub memcached_host: String,
    /// Memcached port
    pub memcached_port: u16,
    /// Value store backend
    pub backend: Backend,
    /// Timeout in seconds applied when callers don't pick one
    pub default_timeout: u64,
    /// Re-populate the cache from the dump file when opening
    pub restore_on_startup: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DUMP_FILE` - Snapshot path (default: `<temp dir>/cache_dump.json`)
    /// - `CACHE_MAX_SIZE` - Registry cap (default: 1000)
    /// - `CACHE_AUTO_DUMP_INTERVAL` - Seconds between dumps, 0 disables (default: 300)
    /// - `MEMCACHED_HOST` - Memcached host (default: 127.0.0.1)
    /// - `MEMCACHED_PORT` - Memcached port (default: 11211)
    /// - `CACHE_BACKEND` - `memcached` or `memory` (default: memcached)
    /// - `CACHE_DEFAULT_TIMEOUT` - Default timeout in seconds (default: 3600)
    /// - `CACHE_RESTORE_ON_STARTUP` - Restore from the dump on open (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dump_file: env::var("CACHE_DUMP_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.dump_file),
            max_size: env::var("CACHE_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|size| *size > 0)
                .unwrap_or(defaults.max_size),
            auto_dump_interval: env::var("CACHE_AUTO_DUMP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auto_dump_interval),
            memcached_host: env::var("MEMCACHED_HOST")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.memcached_host),
            memcached_port: env::var("MEMCACHED_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.memcached_port),
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| Backend::parse(&v))
                .unwrap_or(defaults.backend),
            default_timeout: env::var("CACHE_DEFAULT_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_timeout),
            restore_on_startup: env::var("CACHE_RESTORE_ON_STARTUP")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.restore_on_startup),
        }
    }

    /// Connection URL understood by the memcache client.
    pub fn memcached_url(&self) -> String {
        format!("memcache://{}:{}", self.memcached_host, self.memcached_port)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dump_file: env::temp_dir().join("cache_dump.json"),
            max_size: 1000,
            auto_dump_interval: 300,
            memcached_host: "127.0.0.1".to_string(),
            memcached_port: 11211,
            backend: Backend::Memcached,
            default_timeout: 3600,
            restore_on_startup: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.auto_dump_interval, 300);
        assert_eq!(config.memcached_port, 11211);
        assert_eq!(config.backend, Backend::Memcached);
        assert!(config.dump_file.ends_with("cache_dump.json"));
        assert!(config.restore_on_startup);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the process env to avoid races between tests
        env::remove_var("CACHE_DUMP_FILE");
        env::remove_var("CACHE_MAX_SIZE");
        env::remove_var("CACHE_AUTO_DUMP_INTERVAL");
        env::remove_var("MEMCACHED_HOST");
        env::remove_var("MEMCACHED_PORT");
        env::remove_var("CACHE_BACKEND");
        env::remove_var("CACHE_DEFAULT_TIMEOUT");
        env::remove_var("CACHE_RESTORE_ON_STARTUP");

        let config = Config::from_env();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.auto_dump_interval, 300);
        assert_eq!(config.default_timeout, 3600);
        assert_eq!(config.dump_file, Config::default().dump_file);
        assert_eq!(config.memcached_url(), "memcache://127.0.0.1:11211");

        env::set_var("CACHE_MAX_SIZE", "50");
        env::set_var("CACHE_AUTO_DUMP_INTERVAL", "0");
        env::set_var("MEMCACHED_HOST", "cache.internal");
        env::set_var("MEMCACHED_PORT", "21211");
        env::set_var("CACHE_BACKEND", "memory");
        env::set_var("CACHE_RESTORE_ON_STARTUP", "no");
        env::set_var("CACHE_DUMP_FILE", "/var/lib/cache/dump.json");
        env::set_var("CACHE_DEFAULT_TIMEOUT", "90");

        let config = Config::from_env();
        assert_eq!(config.max_size, 50);
        assert_eq!(config.auto_dump_interval, 0);
        assert_eq!(config.memcached_url(), "memcache://cache.internal:21211");
        assert_eq!(config.backend, Backend::Memory);
        assert!(!config.restore_on_startup);
        assert_eq!(config.dump_file, PathBuf::from("/var/lib/cache/dump.json"));
        assert_eq!(config.default_timeout, 90);

        // Unparseable or blank values fall back to defaults
        env::set_var("CACHE_MAX_SIZE", "lots");
        env::set_var("CACHE_BACKEND", "redis");
        env::set_var("CACHE_DUMP_FILE", "   ");
        env::set_var("CACHE_DEFAULT_TIMEOUT", "-5");
        let config = Config::from_env();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.backend, Backend::Memcached);
        assert_eq!(config.dump_file, Config::default().dump_file);
        assert_eq!(config.default_timeout, 3600);

        for var in [
            "CACHE_DUMP_FILE",
            "CACHE_MAX_SIZE",
            "CACHE_AUTO_DUMP_INTERVAL",
            "MEMCACHED_HOST",
            "MEMCACHED_PORT",
            "CACHE_BACKEND",
            "CACHE_DEFAULT_TIMEOUT",
            "CACHE_RESTORE_ON_STARTUP",
        ] {
            env::remove_var(var);
        }
    }
}
