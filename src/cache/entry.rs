//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and the heuristic
//! used to size values that arrive without an explicit byte count.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

use crate::cache::DEFAULT_SIZE_ESTIMATE;

// == Cache Entry ==
/// A single cache entry with its accounting metadata.
///
/// Entries are owned exclusively by the store; nothing outside it ever
/// holds a reference to one.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Bytes charged against the store's budget for this entry
    pub size: u64,
    /// Logical sequence number of the most recent access or insert.
    /// Strictly increasing across the store, so two accesses within the
    /// same clock tick remain orderable.
    pub last_access_seq: u64,
    /// Instant of the most recent access or insert, for TTL arithmetic
    pub touched_at: Instant,
    /// Number of successful lookups served by this entry
    pub hit_count: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry at the given access sequence with zero hits.
    pub fn new(value: V, size: u64, seq: u64) -> Self {
        Self {
            value,
            size,
            last_access_seq: seq,
            touched_at: Instant::now(),
            hit_count: 0,
        }
    }

    // == Touch ==
    /// Refreshes recency and counts a hit.
    pub fn touch(&mut self, seq: u64) {
        self.last_access_seq = seq;
        self.touched_at = Instant::now();
        self.hit_count += 1;
    }

    // == Is Expired ==
    /// Checks whether the entry has sat idle longer than `ttl`.
    ///
    /// Expiry is idle-based: the clock restarts on every access. An entry
    /// is expired only when the idle time strictly exceeds the TTL, and an
    /// entry with no TTL configured never expires.
    pub fn is_expired(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(limit) => self.touched_at.elapsed() > limit,
            None => false,
        }
    }
}

// == Size Estimation ==
/// Estimates the in-memory footprint of a value, in bytes.
///
/// String values measure their UTF-8 byte length; any other serializable
/// value measures its JSON-serialized length. Values that fail to
/// serialize are charged a fixed [`DEFAULT_SIZE_ESTIMATE`]. This is a
/// best-effort heuristic: callers that know better (byte buffers in
/// particular, which JSON arrays overestimate) should pass an explicit
/// size instead.
pub fn estimate_size<V: Serialize>(value: &V) -> u64 {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(text)) => text.len() as u64,
        Ok(other) => other.to_string().len() as u64,
        Err(err) => {
            warn!("size estimation failed, charging default: {}", err);
            DEFAULT_SIZE_ESTIMATE
        }
    }
}
