//! # LineQueue
//!
//! A network-accessible, disk-backed FIFO queue of text lines:
//! - Line-oriented text protocol (`PUT`, `GET`, `SHUTDOWN`, `QUIT`)
//! - Non-blocking, multiplexed connection handling
//! - Per-connection request ordering under cross-connection concurrency
//! - Lock-free queue storage with dump on shutdown and restore on startup
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Acceptor (mio, non-blocking)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ register (inbox + wake)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │        Multiplexer × N  ──bytes──▶  Session / LineFramer     │
//! └─────────────────────┬──────────────────────▲────────────────┘
//!                       │ offer                │ enable write
//! ┌─────────────────────▼──────────────────────┴────────────────┐
//! │      Scheduler  ──poll──▶  DispatchWorker × M  ──▶ Dispatcher│
//! └─────────────────────────────────────┬───────────────────────┘
//!                                       │
//!                                ┌──────▼──────┐
//!                                │  LineQueue  │──▶ dump file
//!                                └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod storage;
pub mod dispatch;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LineQueueError, Result};
pub use config::Config;
pub use network::Server;
pub use storage::LineQueue;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LineQueue
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
