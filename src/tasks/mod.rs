//! Background Tasks Module
//!
//! Periodic maintenance that runs alongside cache callers.
//!
//! # Tasks
//! - TTL Sweep: removes expired entries at configured intervals
//! - Memory Monitor: forces extra eviction under host memory pressure

mod cleanup;
mod monitor;

pub use cleanup::spawn_cleanup_task;
pub use monitor::{
    MemoryMonitor, MemoryStatsProvider, MonitorConfig, DEFAULT_MEMORY_THRESHOLD,
    DEFAULT_MONITOR_INTERVAL,
};
