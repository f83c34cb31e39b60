//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries, so
//! idle entries are reclaimed without waiting for a read to discover them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task sleeps for `interval` between sweeps and acquires the store's
/// write lock only for the duration of each sweep.
///
/// # Arguments
/// * `cache` - shared reference to the store to sweep
/// * `interval` - time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task; abort it during shutdown.
pub fn spawn_cleanup_task<V>(
    cache: Arc<RwLock<CacheStore<V>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("starting TTL sweep task, interval {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut store = cache.write().await;
                store.cleanup()
            };

            if removed > 0 {
                info!("TTL sweep removed {} expired entries", removed);
            } else {
                debug!("TTL sweep found no expired entries");
            }
        }
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;

    fn ttl_store(ttl: Duration) -> Arc<RwLock<CacheStore<String>>> {
        let config = CacheConfig::new(100_000, 100).with_ttl(ttl);
        Arc::new(RwLock::new(CacheStore::new(config).unwrap()))
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let cache = ttl_store(Duration::from_millis(80));

        cache
            .write()
            .await
            .set("expire_soon", "value".to_string());

        let handle = spawn_cleanup_task(Arc::clone(&cache), Duration::from_millis(50));

        // Let the entry expire and at least one sweep run.
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(!cache.write().await.has("expire_soon"));
        assert_eq!(cache.read().await.memory_usage(), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_preserves_live_entries() {
        let cache = ttl_store(Duration::from_secs(3600));

        cache.write().await.set("long_lived", "value".to_string());

        let handle = spawn_cleanup_task(Arc::clone(&cache), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(
            cache.write().await.get("long_lived"),
            Some("value".to_string())
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let cache = ttl_store(Duration::from_secs(3600));

        let handle = spawn_cleanup_task(cache, Duration::from_millis(50));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }
}
