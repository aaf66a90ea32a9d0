//! Configuration for LineQueue
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{LineQueueError, Result};

/// Main configuration for a LineQueue server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// File the queue is dumped to on SHUTDOWN and restored from on start.
    /// Consumed (deleted) by every restore attempt.
    pub dump_path: PathBuf,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    // -------------------------------------------------------------------------
    // Worker Pools
    // -------------------------------------------------------------------------
    /// Threads executing commands pulled from the scheduler
    pub dispatch_workers: usize,

    /// Independent I/O event loops, each owning a disjoint set of connections
    pub io_workers: usize,

    /// Event loops accepting new connections on the listen socket
    pub acceptor_workers: usize,

    // -------------------------------------------------------------------------
    // Timing
    // -------------------------------------------------------------------------
    /// Upper bound for every blocking wait (readiness wait, scheduler poll)
    pub poll_timeout_ms: u64,

    /// How long stop waits for each pool before moving on
    pub shutdown_grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dump_path: PathBuf::from("line_queue.dump"),
            listen_addr: "127.0.0.1:10042".to_string(),
            dispatch_workers: 4,
            io_workers: 2,
            acceptor_workers: 1,
            poll_timeout_ms: 1000,
            shutdown_grace_ms: 10_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that every pool has at least one worker and timeouts are non-zero
    pub fn validate(&self) -> Result<()> {
        let pools = [
            ("dispatch_workers", self.dispatch_workers),
            ("io_workers", self.io_workers),
            ("acceptor_workers", self.acceptor_workers),
        ];
        for (name, count) in pools {
            if count == 0 {
                return Err(LineQueueError::Config(format!("{} must be at least 1", name)));
            }
        }

        if self.poll_timeout_ms == 0 {
            return Err(LineQueueError::Config(
                "poll_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the dump file path
    pub fn dump_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dump_path = path.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of dispatch worker threads
    pub fn dispatch_workers(mut self, count: usize) -> Self {
        self.config.dispatch_workers = count;
        self
    }

    /// Set the number of I/O event loops
    pub fn io_workers(mut self, count: usize) -> Self {
        self.config.io_workers = count;
        self
    }

    /// Set the number of acceptor event loops
    pub fn acceptor_workers(mut self, count: usize) -> Self {
        self.config.acceptor_workers = count;
        self
    }

    /// Set the poll timeout (in milliseconds)
    pub fn poll_timeout_ms(mut self, ms: u64) -> Self {
        self.config.poll_timeout_ms = ms;
        self
    }

    /// Set the per-pool shutdown grace period (in milliseconds)
    pub fn shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_grace_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
