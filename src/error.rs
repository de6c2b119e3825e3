//! Error types for CaskDB
//!
//! Provides a unified error type for all engine operations.

use thiserror::Error;

/// Result type alias using CaskError
pub type Result<T> = std::result::Result<T, CaskError>;

/// Unified error type for CaskDB operations
#[derive(Debug, Error)]
pub enum CaskError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The log handle was closed by a merge swap that did not complete
    #[error("Active log unavailable: merge swap did not complete")]
    LogUnavailable,

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    #[error("Record too large: {field} length {len} exceeds u32::MAX")]
    RecordTooLarge { field: &'static str, len: usize },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Background Errors
    // -------------------------------------------------------------------------
    #[error("Merge worker error: {0}")]
    MergeWorker(String),
}

impl CaskError {
    /// True for checksum or framing failures
    pub fn is_corruption(&self) -> bool {
        matches!(self, CaskError::DataCorruption(_))
    }
}
