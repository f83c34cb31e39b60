//! Content Deduplication Module
//!
//! Answers "have I seen this content before" by keying a bounded cache
//! store with content digests instead of caller-chosen keys.
//!
//! Because the wrapped store is bounded and LRU-evicting, the index is a
//! best-effort recency window, not a durable content-addressed ledger:
//! a rarely-seen hash can be evicted and later reappear as "new". Callers
//! must treat a negative answer as an optimization hint, never as a
//! correctness guarantee.

use std::fmt;
use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::digest::Output;
use sha2::{Digest, Sha256, Sha512};
use tokio::sync::RwLock;

use crate::cache::{CacheConfig, CacheStore};
use crate::error::{CacheError, Result};

/// Read chunk size for streaming digests.
const HASH_BUFFER_SIZE: usize = 8192;

// == Hash Algorithm ==
/// Digest algorithm used to identify content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Md5,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Md5 => "md5",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for HashAlgorithm {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "md5" => Ok(HashAlgorithm::Md5),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown hash algorithm: {}",
                other
            ))),
        }
    }
}

// == Records ==
/// Value stored per content digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHashEntry {
    /// Where the content lives
    pub path: String,
    /// Byte count of the content itself (not of this record)
    pub size: u64,
    /// When the digest was recorded
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied annotations
    pub metadata: Option<serde_json::Value>,
}

/// Outcome of a duplicate check.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCheck {
    /// Whether the digest is currently known to the index
    pub is_duplicate: bool,
    /// Lowercase-hex digest of the content
    pub hash: String,
    /// Recorded location of the previously-seen content, when duplicate
    pub existing_path: Option<String>,
}

// == Dedup Index ==
/// Content-addressed view over a bounded cache store.
#[derive(Debug, Clone)]
pub struct DedupIndex {
    store: Arc<RwLock<CacheStore<FileHashEntry>>>,
}

impl DedupIndex {
    // == Constructor ==
    /// Creates an index over a fresh store.
    pub fn new(config: CacheConfig<FileHashEntry>) -> Result<Self> {
        Ok(Self {
            store: Arc::new(RwLock::new(CacheStore::new(config)?)),
        })
    }

    /// Builds an index over an existing store, e.g. one also wrapped by a
    /// memory monitor. The two extensions compose over one store.
    pub fn with_store(store: Arc<RwLock<CacheStore<FileHashEntry>>>) -> Self {
        Self { store }
    }

    /// Returns a handle onto the wrapped store.
    pub fn store(&self) -> Arc<RwLock<CacheStore<FileHashEntry>>> {
        Arc::clone(&self.store)
    }

    // == Check Bytes ==
    /// Digests an in-memory buffer and looks it up in the index.
    ///
    /// A positive check refreshes the digest's recency window.
    pub async fn check_bytes(&self, content: &[u8], algorithm: HashAlgorithm) -> DuplicateCheck {
        let hash = digest_bytes(algorithm, content);
        self.lookup(hash).await
    }

    // == Check Reader ==
    /// Digests a stream and looks it up in the index.
    ///
    /// # Errors
    /// Any read failure surfaces as `CacheError::HashComputation` so the
    /// caller can tell "could not determine" apart from "definitely new".
    pub async fn check_reader<R: Read>(
        &self,
        reader: R,
        algorithm: HashAlgorithm,
    ) -> Result<DuplicateCheck> {
        let hash = digest_reader(algorithm, reader)
            .map_err(|source| CacheError::HashComputation { algorithm, source })?;
        Ok(self.lookup(hash).await)
    }

    // == Store File Hash ==
    /// Records content at `path` under its digest.
    ///
    /// `size` is the content's byte count, carried as metadata; the cache
    /// charges the small record itself, not the content, against its
    /// budget. Returns whether the record was admitted.
    pub async fn store_file_hash(
        &self,
        hash: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        metadata: Option<serde_json::Value>,
    ) -> bool {
        let record = FileHashEntry {
            path: path.into(),
            size,
            timestamp: Utc::now(),
            metadata,
        };
        self.store.write().await.set(hash.into(), record)
    }

    async fn lookup(&self, hash: String) -> DuplicateCheck {
        let existing = self.store.write().await.get(&hash);
        match existing {
            Some(record) => DuplicateCheck {
                is_duplicate: true,
                existing_path: Some(record.path),
                hash,
            },
            None => DuplicateCheck {
                is_duplicate: false,
                existing_path: None,
                hash,
            },
        }
    }
}

// == Digest Helpers ==

fn digest_bytes(algorithm: HashAlgorithm, content: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(content)),
        HashAlgorithm::Sha512 => format!("{:x}", Sha512::digest(content)),
        HashAlgorithm::Md5 => format!("{:x}", Md5::digest(content)),
    }
}

fn digest_reader<R: Read>(algorithm: HashAlgorithm, reader: R) -> std::io::Result<String> {
    match algorithm {
        HashAlgorithm::Sha256 => hash_stream::<Sha256, R>(reader),
        HashAlgorithm::Sha512 => hash_stream::<Sha512, R>(reader),
        HashAlgorithm::Md5 => hash_stream::<Md5, R>(reader),
    }
}

fn hash_stream<D, R>(mut reader: R) -> std::io::Result<String>
where
    D: Digest,
    Output<D>: fmt::LowerHex,
    R: Read,
{
    let mut hasher = D::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
