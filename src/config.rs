//! Configuration Module
//!
//! Environment-driven construction defaults for composition roots that
//! build cache instances. Each store's own configuration is immutable
//! once built; this module only decides the starting values.

use std::env;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::tasks::{MonitorConfig, DEFAULT_MEMORY_THRESHOLD};

/// Construction defaults for a cache, its sweep task, and its monitor.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Total byte budget for the store
    pub max_size_bytes: u64,
    /// Maximum number of entries the store can hold
    pub max_entries: usize,
    /// Idle TTL in milliseconds; None disables expiry
    pub ttl_ms: Option<u64>,
    /// TTL sweep interval in seconds
    pub cleanup_interval_secs: u64,
    /// Memory sampling interval in seconds
    pub monitor_interval_secs: u64,
    /// Memory pressure threshold as a fraction of host memory
    pub memory_threshold: f64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_SIZE_BYTES` - byte budget (default: 64 MiB)
    /// - `MAX_ENTRIES` - entry limit (default: 1000)
    /// - `TTL_MS` - idle TTL in milliseconds (default: unset, no expiry)
    /// - `CLEANUP_INTERVAL_SECS` - sweep frequency (default: 60)
    /// - `MONITOR_INTERVAL_SECS` - sampling frequency (default: 5)
    /// - `MEMORY_THRESHOLD` - pressure threshold (default: 0.8)
    pub fn from_env() -> Self {
        Self {
            max_size_bytes: env::var("MAX_SIZE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64 * 1024 * 1024),
            max_entries: env::var("MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            ttl_ms: env::var("TTL_MS").ok().and_then(|v| v.parse().ok()),
            cleanup_interval_secs: env::var("CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            monitor_interval_secs: env::var("MONITOR_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            memory_threshold: env::var("MEMORY_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MEMORY_THRESHOLD),
        }
    }

    /// Store configuration for values of type `V`.
    pub fn cache_config<V>(&self) -> CacheConfig<V> {
        let config = CacheConfig::new(self.max_size_bytes, self.max_entries);
        match self.ttl_ms {
            Some(ms) => config.with_ttl(Duration::from_millis(ms)),
            None => config,
        }
    }

    /// Monitor sampling settings.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.monitor_interval_secs),
            threshold: self.memory_threshold,
        }
    }

    /// TTL sweep interval.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size_bytes: 64 * 1024 * 1024,
            max_entries: 1000,
            ttl_ms: None,
            cleanup_interval_secs: 60,
            monitor_interval_secs: 5,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
        }
    }
}
