//! Error types for the caching subsystem
//!
//! Provides unified error handling using thiserror. Cache misses, TTL
//! expiries, and oversized rejections are ordinary return values, never
//! errors; only construction mistakes and digest failures surface here.

use thiserror::Error;

use crate::dedup::HashAlgorithm;

// == Cache Error Enum ==
/// Unified error type for the caching subsystem.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store, monitor, or algorithm selection built with unusable parameters
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Content could not be read while computing a digest.
    ///
    /// Callers must treat this as "could not determine", never as
    /// "not a duplicate".
    #[error("failed to compute {algorithm} digest")]
    HashComputation {
        /// Algorithm that was being applied when the read failed
        algorithm: HashAlgorithm,
        #[source]
        source: std::io::Error,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the caching subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;
