//! Line queue
//!
//! Concurrent FIFO of lines keyed by monotonically increasing sequence ids.
//! Lines are opaque bytes; nothing is decoded on the way in or out.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use crossbeam::utils::Backoff;
use dashmap::DashMap;

use crate::error::{LineQueueError, Result};

use super::dump::{DumpReader, DumpWriter};

/// Thread-safe FIFO storage of lines
///
/// ## Concurrency:
/// - `last_stored`: write cursor, advanced by `fetch_add` in `add`
/// - `last_read`: read cursor, advanced by compare-and-swap in `poll`
/// - `entries`: per-key concurrent map; no lock spans an add or poll call
///
/// Insertion is two-step (reserve id, then store the value), so a poller may
/// reserve an id whose value is not visible yet. It spins until it is.
pub struct LineQueue {
    /// File this queue is dumped to / restored from
    dump_path: PathBuf,

    /// Sequence id of the last reserved entry (ids start at 1)
    last_stored: AtomicU64,

    /// Sequence id of the last entry handed out by `poll`
    last_read: AtomicU64,

    /// Stored lines by sequence id
    entries: DashMap<u64, Bytes>,
}

impl LineQueue {
    /// Create an empty queue bound to a dump file
    pub fn new(dump_path: impl Into<PathBuf>) -> Self {
        Self {
            dump_path: dump_path.into(),
            last_stored: AtomicU64::new(0),
            last_read: AtomicU64::new(0),
            entries: DashMap::new(),
        }
    }

    /// Append a line, returning the sequence id assigned to it
    pub fn add(&self, line: impl Into<Bytes>) -> u64 {
        let id = self.last_stored.fetch_add(1, Ordering::AcqRel) + 1;
        self.entries.insert(id, line.into());
        id
    }

    /// Remove and return the first `count` lines in insertion order.
    ///
    /// Fails with `NotEnoughData`, leaving the queue untouched, when fewer
    /// than `count` lines have been added but not yet read. Counts past the
    /// id range fail the same way.
    pub fn poll(&self, count: usize) -> Result<Vec<Bytes>> {
        let count = u64::try_from(count).unwrap_or(u64::MAX);

        let mut first = self.last_read.load(Ordering::Acquire);
        let last = loop {
            let stored = self.last_stored.load(Ordering::Acquire);
            let last = match first.checked_add(count) {
                Some(last) if last <= stored => last,
                _ => {
                    return Err(LineQueueError::NotEnoughData {
                        requested: count,
                        available: stored.saturating_sub(first),
                    })
                }
            };

            match self.last_read.compare_exchange_weak(
                first,
                last,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break last,
                Err(actual) => first = actual,
            }
        };

        let mut lines = Vec::with_capacity((last - first) as usize);
        for id in first + 1..=last {
            lines.push(self.take(id));
        }

        Ok(lines)
    }

    /// Remove a reserved id, waiting for a concurrent `add` to publish it
    fn take(&self, id: u64) -> Bytes {
        let backoff = Backoff::new();
        loop {
            if let Some((_, line)) = self.entries.remove(&id) {
                return line;
            }
            backoff.snooze();
        }
    }

    /// Number of lines added but not yet read
    pub fn len(&self) -> u64 {
        let read = self.last_read.load(Ordering::Acquire);
        self.last_stored.load(Ordering::Acquire).saturating_sub(read)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the dump file
    pub fn dump_path(&self) -> &Path {
        &self.dump_path
    }

    /// Write every unread line to the dump file, oldest first, and sync it.
    ///
    /// The file is rewritten from scratch. Meant to run once serving has
    /// stopped; ids consumed concurrently are skipped.
    pub fn dump(&self) -> Result<u64> {
        let first = self.last_read.load(Ordering::Acquire) + 1;
        let last = self.last_stored.load(Ordering::Acquire);

        let file = File::create(&self.dump_path)?;
        let mut writer = DumpWriter::new(BufWriter::new(file));

        for id in first..=last {
            match self.entries.get(&id) {
                Some(line) => writer.write_record(&line)?,
                None => tracing::debug!("Skipping id {} missing from queue during dump", id),
            }
        }

        let records = writer.records();
        let file = writer
            .finish()?
            .into_inner()
            .map_err(|e| LineQueueError::Io(e.into_error()))?;
        file.sync_all()?;

        tracing::info!("Dumped {} lines to {}", records, self.dump_path.display());
        Ok(records)
    }

    /// Load a previous dump, if any, appending its lines with fresh ids.
    ///
    /// The dump file is deleted afterwards whether or not loading succeeded.
    /// A failure means the queue is only partially restored.
    pub fn restore(&self) -> Result<u64> {
        if !self.dump_path.exists() {
            return Ok(0);
        }

        let result = self.load_dump();

        if let Err(e) = fs::remove_file(&self.dump_path) {
            tracing::error!("Failed to delete dump file {}: {}", self.dump_path.display(), e);
        }

        match &result {
            Ok(restored) => tracing::info!(
                "Restored {} lines from {}",
                restored,
                self.dump_path.display()
            ),
            Err(e) => tracing::error!(
                "Restore from {} failed, dump may be corrupted: {}",
                self.dump_path.display(),
                e
            ),
        }

        result
    }

    fn load_dump(&self) -> Result<u64> {
        let file = File::open(&self.dump_path)?;
        let mut restored = 0;

        for record in DumpReader::new(BufReader::new(file)) {
            let record = record?;
            self.add(record);
            restored += 1;
        }

        Ok(restored)
    }
}
