//! Hotcache - bounded in-memory caching with adaptive eviction
//!
//! Provides an LRU + TTL entry store, content-hash deduplication over the
//! same store contract, and a memory-pressure monitor that forces extra
//! eviction when the host runs hot. The two extensions compose over one
//! store; neither inherits from it.

pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod events;
pub mod tasks;

pub use cache::{CacheConfig, CacheStore, StatsSnapshot, DEFAULT_SIZE_ESTIMATE};
pub use config::Config;
pub use dedup::{DedupIndex, DuplicateCheck, FileHashEntry, HashAlgorithm};
pub use error::{CacheError, Result};
pub use events::{CacheEvent, EventBus, RejectReason, SubscriberId};
pub use tasks::{spawn_cleanup_task, MemoryMonitor, MemoryStatsProvider, MonitorConfig};
