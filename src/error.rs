//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error Enum ==
/// Failure reported by a persistent key-value store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem or device failure
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file or value could not be (de)serialized
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend-specific failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Persistent tier failed
    #[error("Persistent store failed: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
