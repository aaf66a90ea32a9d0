//! Error types for LineQueue
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LineQueueError
pub type Result<T> = std::result::Result<T, LineQueueError>;

/// Unified error type for LineQueue operations
#[derive(Debug, Error)]
pub enum LineQueueError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Dump corrupted: expected record of {expected} bytes, read only {read}")]
    DumpCorrupted { expected: usize, read: usize },

    #[error("Not enough data: requested {requested} lines, {available} available")]
    NotEnoughData { requested: u64, available: u64 },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LineQueueError {
    /// Whether this error is answered with the generic protocol error marker
    /// instead of tearing anything down.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LineQueueError::UnknownCommand(_)
                | LineQueueError::InvalidArgument(_)
                | LineQueueError::NotEnoughData { .. }
        )
    }
}
