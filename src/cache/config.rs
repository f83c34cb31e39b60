//! Cache Configuration Module
//!
//! Per-store configuration, fixed for the lifetime of a store instance.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Teardown hook invoked with the key and value of every entry the store
/// destroys: explicit delete, clear, LRU eviction, TTL expiry, and the
/// replaced value of a same-key overwrite.
pub type EvictCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;

// == Cache Config ==
/// Immutable configuration for a [`CacheStore`](crate::cache::CacheStore).
pub struct CacheConfig<V> {
    /// Total byte budget across all entries
    pub max_size_bytes: u64,
    /// Maximum number of live entries
    pub max_entries: usize,
    /// Idle time after which an entry expires; None disables expiry
    pub ttl: Option<Duration>,
    /// Optional teardown hook
    pub on_evict: Option<EvictCallback<V>>,
}

impl<V> CacheConfig<V> {
    // == Constructor ==
    /// Creates a configuration with no TTL and no teardown hook.
    pub fn new(max_size_bytes: u64, max_entries: usize) -> Self {
        Self {
            max_size_bytes,
            max_entries,
            ttl: None,
            on_evict: None,
        }
    }

    // == With TTL ==
    /// Sets the idle TTL for entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    // == With Evict Callback ==
    /// Sets the teardown hook.
    pub fn with_on_evict(mut self, callback: impl Fn(&str, &V) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Arc::new(callback));
        self
    }

    // == Validate ==
    /// Rejects configurations no store could operate under.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_size_bytes == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// Manual impls: the callback is neither Clone-derivable nor Debug.
impl<V> Clone for CacheConfig<V> {
    fn clone(&self) -> Self {
        Self {
            max_size_bytes: self.max_size_bytes,
            max_entries: self.max_entries,
            ttl: self.ttl,
            on_evict: self.on_evict.clone(),
        }
    }
}

impl<V> fmt::Debug for CacheConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("max_size_bytes", &self.max_size_bytes)
            .field("max_entries", &self.max_entries)
            .field("ttl", &self.ttl)
            .field("on_evict", &self.on_evict.is_some())
            .finish()
    }
}
