//! Storage Module
//!
//! Persistent FIFO storage of lines.
//!
//! ## Responsibilities
//! - Lock-free add / bulk ordered poll across threads
//! - Dump unread lines to disk on shutdown
//! - One-shot, destructive restore of a dump on startup
//!
//! ## Dump File Format
//! ```text
//! ┌──────────────┬─────────────────────────┐
//! │ Len (4, BE)  │ Line bytes (Len)        │  record 1 (oldest)
//! ├──────────────┼─────────────────────────┤
//! │ Len (4, BE)  │ Line bytes (Len)        │  record 2
//! └──────────────┴─────────────────────────┘
//!   ... one record per unread line, terminators included
//! ```

mod dump;
mod queue;

pub use dump::{DumpReader, DumpWriter, LENGTH_PREFIX_SIZE};
pub use queue::LineQueue;
