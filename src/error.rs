//! Error types for pageheap
//!
//! Provides a unified error type for all page, allocator and free-set operations.

use thiserror::Error;

/// Result type alias using HeapError
pub type Result<T> = std::result::Result<T, HeapError>;

/// Unified error type for pageheap operations
#[derive(Debug, Error)]
pub enum HeapError {
    // -------------------------------------------------------------------------
    // Medium Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Medium or allocator is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration mismatch: {0}")]
    ConfigMismatch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Addressing Errors
    // -------------------------------------------------------------------------
    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // -------------------------------------------------------------------------
    // Capability Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for HeapError {
    fn from(err: bincode::Error) -> Self {
        HeapError::Serialization(err.to_string())
    }
}
