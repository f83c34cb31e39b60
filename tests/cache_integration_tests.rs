//! Integration Tests for the Caching Subsystem
//!
//! Exercises the entry store, deduplication index, and memory monitor
//! composed the way an embedding application wires them together: one
//! store behind a lock, extensions layered on top, observers attached to
//! the event stream.

use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::RwLock;

use hotcache::{
    spawn_cleanup_task, CacheConfig, CacheError, CacheEvent, CacheStore, DedupIndex,
    FileHashEntry, HashAlgorithm, MemoryMonitor, MemoryStatsProvider, MonitorConfig,
    RejectReason,
};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotcache=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn collect_events(store: &CacheStore<String>) -> Arc<Mutex<Vec<CacheEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store
        .events()
        .subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    seen
}

struct FakeMemoryStats {
    used: AtomicU64,
    total: AtomicU64,
}

impl FakeMemoryStats {
    fn reporting(used: u64, total: u64) -> Arc<Self> {
        Arc::new(Self {
            used: AtomicU64::new(used),
            total: AtomicU64::new(total),
        })
    }
}

impl MemoryStatsProvider for FakeMemoryStats {
    fn process_memory_used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    fn total_system_memory(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

/// Reader whose first read fails, simulating a stream that went away.
struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream gone"))
    }
}

// == Entry Store Scenarios ==

#[test]
fn test_lru_scenario_from_capacity_two() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new(100_000, 2)).unwrap();

    assert!(store.set_sized("a", "1".to_string(), Some(100)));
    assert!(store.set_sized("b", "2".to_string(), Some(100)));
    assert_eq!(store.get("a"), Some("1".to_string()));
    assert!(store.set_sized("c", "3".to_string(), Some(100)));

    assert!(!store.has("b"), "least recently used key must go first");
    assert!(store.has("a"));
    assert!(store.has("c"));
    assert_eq!(store.len(), 2);
}

#[test]
fn test_oversized_set_rejected_without_side_effects() {
    let mut store = CacheStore::new(CacheConfig::new(500, 10)).unwrap();
    store.set_sized("kept", "v".to_string(), Some(200));
    let events = collect_events(&store);

    assert!(!store.set_sized("too_big", "x".to_string(), Some(501)));

    let stats = store.stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.size_bytes, 200);
    assert_eq!(stats.evictions, 0);
    assert_eq!(
        *events.lock().unwrap(),
        vec![CacheEvent::Reject {
            key: "too_big".to_string(),
            reason: RejectReason::SizeExceeded,
        }]
    );
}

#[tokio::test]
async fn test_ttl_expiry_is_observable_as_expired() {
    let config = CacheConfig::new(100_000, 10).with_ttl(Duration::from_millis(100));
    let mut store = CacheStore::new(config).unwrap();
    let events = collect_events(&store);

    store.set_sized("x", "v".to_string(), Some(10));
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(store.get("x"), None);
    assert!(!store.has("x"));

    let seen = events.lock().unwrap();
    assert!(seen.contains(&CacheEvent::Expired {
        key: "x".to_string()
    }));
    assert!(!seen.contains(&CacheEvent::Miss {
        key: "x".to_string()
    }));
}

#[test]
fn test_clear_keeps_lifetime_counters() {
    let mut store = CacheStore::new(CacheConfig::new(100_000, 2)).unwrap();

    store.set_sized("a", "1".to_string(), Some(10));
    store.get("a");
    store.get("missing");
    store.set_sized("b", "2".to_string(), Some(10));
    store.set_sized("c", "3".to_string(), Some(10)); // evicts "a" or "b"

    store.clear();

    let stats = store.stats();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.size_bytes, 0);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.evictions, 1);
}

#[test]
fn test_unsubscribed_observer_stops_receiving() {
    let mut store = CacheStore::new(CacheConfig::new(100_000, 10)).unwrap();
    let count = Arc::new(Mutex::new(0u32));
    let sink = Arc::clone(&count);
    let bus = store.events();
    let id = bus.subscribe(move |_| *sink.lock().unwrap() += 1);

    store.set_sized("a", "1".to_string(), Some(1));
    assert!(bus.unsubscribe(id));
    store.set_sized("b", "2".to_string(), Some(1));

    assert_eq!(*count.lock().unwrap(), 1);
}

// == Deduplication Scenarios ==

#[tokio::test]
async fn test_dedup_check_store_check() -> Result<()> {
    let index = DedupIndex::new(CacheConfig::new(100_000, 100))?;
    let content = b"nightly export payload";

    let first = index.check_bytes(content, HashAlgorithm::Sha256).await;
    assert!(!first.is_duplicate);

    assert!(
        index
            .store_file_hash(
                first.hash.clone(),
                "/exports/nightly.bin",
                content.len() as u64,
                None,
            )
            .await
    );

    let second = index.check_bytes(content, HashAlgorithm::Sha256).await;
    assert!(second.is_duplicate);
    assert_eq!(second.hash, first.hash);
    assert_eq!(second.existing_path.as_deref(), Some("/exports/nightly.bin"));
    Ok(())
}

#[tokio::test]
async fn test_dedup_hash_failure_is_distinct_from_new_content() {
    let index = DedupIndex::new(CacheConfig::new(100_000, 100)).unwrap();

    let result = index.check_reader(FailingReader, HashAlgorithm::Md5).await;

    match result {
        Err(CacheError::HashComputation { algorithm, .. }) => {
            assert_eq!(algorithm, HashAlgorithm::Md5);
        }
        other => panic!("expected HashComputation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dedup_reader_matches_bytes() -> Result<()> {
    let index = DedupIndex::new(CacheConfig::new(100_000, 100))?;
    let content = b"content that arrives both ways".to_vec();

    let from_bytes = index.check_bytes(&content, HashAlgorithm::Sha512).await;
    let from_reader = index
        .check_reader(io::Cursor::new(content), HashAlgorithm::Sha512)
        .await?;

    assert_eq!(from_bytes.hash, from_reader.hash);
    Ok(())
}

// == Memory Monitor Scenarios ==

#[tokio::test]
async fn test_pressure_halves_wrapped_store() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new(1_000_000, 1000)).unwrap();
    for index in 0..20 {
        store.set_sized(format!("key{}", index), "v".to_string(), Some(50));
    }
    let cache = Arc::new(RwLock::new(store));
    let before = cache.read().await.memory_usage();

    let provider = FakeMemoryStats::reporting(900, 1000);
    let config = MonitorConfig {
        interval: Duration::from_millis(50),
        threshold: 0.8,
    };
    let mut monitor = MemoryMonitor::new(Arc::clone(&cache), provider, config);

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert!(cache.read().await.memory_usage() <= before / 2);

    monitor.destroy().await;
    assert!(cache.read().await.is_empty());
}

#[tokio::test]
async fn test_monitor_destroy_idempotent_and_final() {
    let cache = Arc::new(RwLock::new(
        CacheStore::<String>::new(CacheConfig::new(100_000, 100)).unwrap(),
    ));
    let provider = FakeMemoryStats::reporting(900, 1000);
    let mut monitor = MemoryMonitor::new(
        Arc::clone(&cache),
        provider,
        MonitorConfig {
            interval: Duration::from_millis(30),
            threshold: 0.8,
        },
    );

    monitor.destroy().await;
    monitor.destroy().await;
    assert!(monitor.is_destroyed());

    // Threshold adjustment after destroy is a safe no-op.
    let unchanged = monitor.threshold();
    assert_eq!(monitor.set_memory_threshold(0.2), unchanged);

    // No tick runs after destroy: the store stays empty.
    cache
        .write()
        .await
        .set_sized("late", "v".to_string(), Some(10));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.write().await.has("late"));
}

#[tokio::test]
async fn test_monitor_and_dedup_compose_over_one_store() {
    // The dedup index and the monitor are independent extensions over the
    // same store contract.
    let store = Arc::new(RwLock::new(
        CacheStore::<FileHashEntry>::new(CacheConfig::new(1_000_000, 1000)).unwrap(),
    ));
    let index = DedupIndex::with_store(Arc::clone(&store));

    for seed in 0u32..20 {
        let content = seed.to_le_bytes();
        let check = index.check_bytes(&content, HashAlgorithm::Sha256).await;
        index
            .store_file_hash(check.hash, format!("/blobs/{}", seed), 4, None)
            .await;
    }
    let before = store.read().await.memory_usage();
    assert!(before > 0);

    let provider = FakeMemoryStats::reporting(950, 1000);
    let mut monitor = MemoryMonitor::new(
        Arc::clone(&store),
        provider,
        MonitorConfig {
            interval: Duration::from_millis(50),
            threshold: 0.8,
        },
    );

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert!(store.read().await.memory_usage() <= before / 2);
    // Surviving hashes still answer duplicate checks.
    let keys = store.read().await.keys();
    assert!(!keys.is_empty());

    monitor.destroy().await;
}

// == Background Sweep Scenario ==

#[tokio::test]
async fn test_cleanup_task_reclaims_without_reads() {
    let config = CacheConfig::new(100_000, 100).with_ttl(Duration::from_millis(80));
    let cache = Arc::new(RwLock::new(CacheStore::new(config).unwrap()));

    cache
        .write()
        .await
        .set_sized("stale", "v".to_string(), Some(10));

    let handle = spawn_cleanup_task(Arc::clone(&cache), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(250)).await;

    // Reclaimed by the sweep, not by a lazy read.
    assert_eq!(cache.read().await.len(), 0);
    assert_eq!(cache.read().await.memory_usage(), 0);

    handle.abort();
}
