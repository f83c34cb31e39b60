//! Memory Pressure Monitor
//!
//! Watches process memory against total host memory and forces extra LRU
//! eviction on a wrapped cache store when a threshold is crossed. The
//! monitor holds a store and calls its public operations; it is an
//! extension over the store contract, not a subtype of it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

// == Memory Stats Provider ==
/// Host-supplied memory statistics capability.
///
/// Injecting this keeps the monitor decoupled from any particular OS
/// interface and makes pressure scenarios trivial to stage in tests.
pub trait MemoryStatsProvider: Send + Sync {
    /// Resident memory currently used by this process, in bytes.
    fn process_memory_used(&self) -> u64;
    /// Total physical memory of the host, in bytes.
    fn total_system_memory(&self) -> u64;
}

// == Constants ==
/// Default pressure threshold as a fraction of total host memory
pub const DEFAULT_MEMORY_THRESHOLD: f64 = 0.8;
/// Default sampling interval
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(5);

const MIN_THRESHOLD: f64 = 0.1;
const MAX_THRESHOLD: f64 = 0.95;

// == Monitor Config ==
/// Sampling settings for a [`MemoryMonitor`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between memory samples
    pub interval: Duration,
    /// Pressure threshold, clamped to [0.10, 0.95] on use
    pub threshold: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_MONITOR_INTERVAL,
            threshold: DEFAULT_MEMORY_THRESHOLD,
        }
    }
}

// == Memory Monitor ==
/// Periodic pressure sampler over a shared cache store.
///
/// Each tick computes `used / total`; when the ratio exceeds the
/// threshold the store publishes one `MemoryPressure` event and evicts
/// down to half its tracked size. Sampling stops at [`destroy`]
/// (idempotent: abort the task, then clear the store); dropping the
/// monitor also aborts the task so no scheduled work can dangle.
///
/// [`destroy`]: MemoryMonitor::destroy
pub struct MemoryMonitor<V> {
    cache: Arc<RwLock<CacheStore<V>>>,
    threshold: Arc<Mutex<f64>>,
    handle: Option<JoinHandle<()>>,
}

impl<V> MemoryMonitor<V>
where
    V: Send + Sync + 'static,
{
    // == Constructor ==
    /// Wraps a store and starts sampling immediately.
    pub fn new(
        cache: Arc<RwLock<CacheStore<V>>>,
        provider: Arc<dyn MemoryStatsProvider>,
        config: MonitorConfig,
    ) -> Self {
        let threshold = Arc::new(Mutex::new(
            config.threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD),
        ));
        let handle = tokio::spawn(run_monitor(
            Arc::clone(&cache),
            provider,
            Arc::clone(&threshold),
            config.interval,
        ));

        Self {
            cache,
            threshold,
            handle: Some(handle),
        }
    }

    // == Set Threshold ==
    /// Adjusts the pressure threshold, clamped to [0.10, 0.95].
    ///
    /// Returns the value actually applied. After `destroy` this is a
    /// no-op returning the last threshold.
    pub fn set_memory_threshold(&self, value: f64) -> f64 {
        if self.handle.is_none() {
            return *self.threshold.lock();
        }
        let clamped = value.clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        *self.threshold.lock() = clamped;
        clamped
    }

    /// Returns the current pressure threshold.
    pub fn threshold(&self) -> f64 {
        *self.threshold.lock()
    }

    /// Whether `destroy` has already run.
    pub fn is_destroyed(&self) -> bool {
        self.handle.is_none()
    }

    // == Destroy ==
    /// Stops sampling and clears the wrapped store.
    ///
    /// Safe to call twice; after it returns no further tick can run.
    pub async fn destroy(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        handle.abort();
        self.cache.write().await.clear();
        info!("memory monitor destroyed");
    }
}

impl<V> Drop for MemoryMonitor<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl<V> fmt::Debug for MemoryMonitor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMonitor")
            .field("threshold", &*self.threshold.lock())
            .field("destroyed", &self.handle.is_none())
            .finish()
    }
}

async fn run_monitor<V>(
    cache: Arc<RwLock<CacheStore<V>>>,
    provider: Arc<dyn MemoryStatsProvider>,
    threshold: Arc<Mutex<f64>>,
    interval: Duration,
) where
    V: Send + Sync + 'static,
{
    info!("starting memory monitor, interval {:?}", interval);

    loop {
        tokio::time::sleep(interval).await;

        let used = provider.process_memory_used();
        let total = provider.total_system_memory();
        if total == 0 {
            debug!("memory stats unavailable, skipping sample");
            continue;
        }

        let ratio = used as f64 / total as f64;
        let limit = *threshold.lock();
        if ratio <= limit {
            debug!(
                "memory sample {:.1}% below threshold {:.1}%",
                ratio * 100.0,
                limit * 100.0
            );
            continue;
        }

        warn!(
            "memory pressure: {:.1}% of host memory in use (threshold {:.1}%)",
            ratio * 100.0,
            limit * 100.0
        );
        let evicted = {
            let mut store = cache.write().await;
            store.handle_memory_pressure(ratio)
        };
        info!("pressure eviction removed {} entries", evicted);
    }
}
