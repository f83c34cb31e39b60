//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with sequence-based LRU
//! tracking, idle-TTL expiry, byte/count capacity enforcement, and event
//! emission.

use std::collections::HashMap;

use serde::Serialize;

use crate::cache::{estimate_size, AccessOrder, CacheConfig, CacheEntry, CacheStats, StatsSnapshot};
use crate::error::Result;
use crate::events::{CacheEvent, EventBus, RejectReason};

// == Cache Store ==
/// Bounded key-value storage with LRU eviction and TTL expiry.
///
/// Every operation takes `&mut self`; multi-threaded hosts share a store
/// behind `Arc<tokio::sync::RwLock<..>>` and hold the write half for the
/// duration of each call, so partial updates are never observable.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Recency index, smallest sequence = least recently used
    order: AccessOrder,
    /// Lifetime performance counters
    stats: CacheStats,
    /// Sum of entry sizes currently held
    current_size: u64,
    /// Monotonic access counter feeding the recency index
    access_seq: u64,
    /// Immutable store configuration
    config: CacheConfig<V>,
    /// Observer registry for cache events
    events: EventBus,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates a store from a validated configuration.
    ///
    /// # Errors
    /// Returns `CacheError::InvalidConfig` when the byte budget or entry
    /// limit is zero.
    pub fn new(config: CacheConfig<V>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            order: AccessOrder::new(),
            stats: CacheStats::new(),
            current_size: 0,
            access_seq: 0,
            config,
            events: EventBus::new(),
        })
    }

    /// Returns a handle onto the store's event bus for subscribing.
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Returns the store's configuration.
    pub fn config(&self) -> &CacheConfig<V> {
        &self.config
    }

    // == Get ==
    /// Retrieves a value by key, refreshing its recency.
    ///
    /// Absent keys count as misses. An entry idle past the configured TTL
    /// is removed on discovery, counts as a miss, and emits `Expired`
    /// rather than `Miss`.
    pub fn get(&mut self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(self.config.ttl),
            None => {
                self.stats.record_miss();
                self.events.publish(&CacheEvent::Miss {
                    key: key.to_string(),
                });
                return None;
            }
        };

        if expired {
            self.expire_entry(key);
            self.stats.record_miss();
            return None;
        }

        let seq = self.next_seq();
        let value = match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(seq);
                entry.value.clone()
            }
            None => return None, // unreachable: presence checked above
        };
        self.order.touch(key, seq);
        self.stats.record_hit();
        self.events.publish(&CacheEvent::Hit {
            key: key.to_string(),
        });
        Some(value)
    }

    // == Set ==
    /// Stores a value, estimating its size from serialization.
    ///
    /// See [`set_sized`](Self::set_sized) for the full semantics.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> bool
    where
        V: Serialize,
    {
        self.set_sized(key, value, None)
    }

    /// Stores a value with an optional explicit size in bytes.
    ///
    /// A value larger than the store's entire byte budget is refused up
    /// front with a `Reject` event and no state change, since evicting
    /// everything else could never make it fit. Overwriting an existing
    /// key removes the
    /// old entry first, then least-recently-used entries are evicted until
    /// both the byte budget and the entry limit admit the new one.
    ///
    /// Returns whether the value was admitted.
    pub fn set_sized(&mut self, key: impl Into<String>, value: V, size: Option<u64>) -> bool
    where
        V: Serialize,
    {
        let key = key.into();
        let size = size.unwrap_or_else(|| estimate_size(&value));

        if size > self.config.max_size_bytes {
            self.events.publish(&CacheEvent::Reject {
                key,
                reason: RejectReason::SizeExceeded,
            });
            return false;
        }

        // Overwrite is delete-then-insert: the replaced value goes through
        // the same teardown hook as any other removal.
        if let Some(previous) = self.entries.remove(&key) {
            self.order.remove(&key);
            self.current_size = self.current_size.saturating_sub(previous.size);
            self.run_on_evict(&key, &previous.value);
        }

        if !self.make_room(size) {
            // Unreachable while size <= max_size_bytes; guards against
            // accounting drift ever admitting an item that does not fit.
            return false;
        }

        let seq = self.next_seq();
        self.order.touch(&key, seq);
        self.current_size += size;
        self.events.publish(&CacheEvent::Set {
            key: key.clone(),
            size,
        });
        self.entries.insert(key, CacheEntry::new(value, size, seq));
        true
    }

    // == Delete ==
    /// Removes an entry by key; returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.remove(key);
                self.current_size = self.current_size.saturating_sub(entry.size);
                self.events.publish(&CacheEvent::Delete {
                    key: key.to_string(),
                });
                self.run_on_evict(key, &entry.value);
                true
            }
            None => false,
        }
    }

    // == Has ==
    /// Existence probe with `get`'s expiry semantics but none of its
    /// side effects on recency or the hit/miss counters, so
    /// administrative checks do not pollute LRU order.
    pub fn has(&mut self, key: &str) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(self.config.ttl),
            None => return false,
        };

        if expired {
            self.expire_entry(key);
            return false;
        }
        true
    }

    // == Clear ==
    /// Empties the store, running the teardown hook for every entry.
    ///
    /// Lifetime hit/miss/eviction counters are content-independent and
    /// survive a clear.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        if let Some(callback) = &self.config.on_evict {
            for (key, entry) in &self.entries {
                callback(key, &entry.value);
            }
        }
        self.entries.clear();
        self.order.clear();
        self.current_size = 0;
        self.events.publish(&CacheEvent::Clear {
            entries_removed: removed,
        });
    }

    // == Keys ==
    /// Returns the live keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Memory Usage ==
    /// Returns the bytes currently charged against the budget.
    pub fn memory_usage(&self) -> u64 {
        self.current_size
    }

    // == Stats ==
    /// Returns a point-in-time snapshot of contents and counters.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            size_bytes: self.current_size,
            entries: self.entries.len(),
            hits: self.stats.hits,
            misses: self.stats.misses,
            evictions: self.stats.evictions,
            hit_rate: self.stats.hit_rate(),
        }
    }

    // == Cleanup ==
    /// Active sweep: removes every entry idle past the TTL, whether or not
    /// anything has tried to read it. Returns the number removed.
    pub fn cleanup(&mut self) -> usize {
        let Some(ttl) = self.config.ttl else {
            return 0;
        };

        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(Some(ttl)))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.expire_entry(key);
        }
        expired_keys.len()
    }

    // == Shrink To ==
    /// Forced-eviction primitive: pops least-recently-used entries until
    /// the tracked size drops to `target_bytes` or the store is empty.
    /// Returns the number of entries evicted.
    pub fn shrink_to(&mut self, target_bytes: u64) -> usize {
        let mut evicted = 0;
        while self.current_size > target_bytes {
            if self.evict_lru().is_none() {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    // == Memory Pressure ==
    /// Publishes `MemoryPressure` and evicts down to half the currently
    /// tracked size. Called by the memory monitor under the store lock.
    pub fn handle_memory_pressure(&mut self, ratio: f64) -> usize {
        self.events.publish(&CacheEvent::MemoryPressure { ratio });
        let target = self.current_size / 2;
        self.shrink_to(target)
    }

    // == Internals ==

    fn next_seq(&mut self) -> u64 {
        self.access_seq += 1;
        self.access_seq
    }

    /// Evicts until the byte budget and entry limit both admit an entry of
    /// `incoming` bytes. Returns whether room was made; an empty recency
    /// index terminates the loop.
    fn make_room(&mut self, incoming: u64) -> bool {
        while self.current_size + incoming > self.config.max_size_bytes
            || self.entries.len() >= self.config.max_entries
        {
            if self.evict_lru().is_none() {
                break;
            }
        }
        self.current_size + incoming <= self.config.max_size_bytes
    }

    /// Removes the least-recently-used entry with full accounting.
    fn evict_lru(&mut self) -> Option<String> {
        let key = self.order.pop_lru()?;
        if let Some(entry) = self.entries.remove(&key) {
            self.current_size = self.current_size.saturating_sub(entry.size);
            self.stats.record_eviction();
            self.events.publish(&CacheEvent::Evict {
                key: key.clone(),
                size: entry.size,
            });
            self.run_on_evict(&key, &entry.value);
        }
        Some(key)
    }

    /// Removes an entry the expiry check has already flagged.
    fn expire_entry(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.order.remove(key);
            self.current_size = self.current_size.saturating_sub(entry.size);
            self.events.publish(&CacheEvent::Expired {
                key: key.to_string(),
            });
            self.run_on_evict(key, &entry.value);
        }
    }

    fn run_on_evict(&self, key: &str, value: &V) {
        if let Some(callback) = &self.config.on_evict {
            callback(key, value);
        }
    }
}
