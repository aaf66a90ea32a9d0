//! Line framer
//!
//! Splits an arbitrary inbound byte stream into lines. Line bytes are kept
//! exactly as received.
//!
//! ## Framing Rules
//! ```text
//!   "multi\r\nline\r\n in"   →  ["multi\r\n", "line\r\n"]   pending: " in"
//!   ^^^^^^^^^ ^^^^^^^^
//!   a line ends at the first non-terminator byte after a run of CR/LF
//! ```
//!
//! - CR and LF are both terminator bytes; a line keeps its whole terminator run.
//! - Input ending inside a terminator run closes the line at end of input.
//!   A CRLF split exactly between two reads therefore yields a line ending in a
//!   bare CR, and the LF comes out as a line of its own.
//! - Input ending outside a terminator run is held as pending and prefixed to
//!   the line that eventually completes.

use bytes::{Bytes, BytesMut};

/// Stateful splitter of inbound bytes into lines
#[derive(Debug, Default)]
pub struct LineFramer {
    /// Bytes of the unfinished line, accumulated across calls
    pending: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract every line completed by `input`, in receipt order.
    ///
    /// Bytes that do not yet form a complete line are retained.
    pub fn extract_completed_lines(&mut self, input: &[u8]) -> Vec<Bytes> {
        let mut lines = Vec::new();
        let mut start = 0;
        let mut in_terminator = false;

        for (i, &byte) in input.iter().enumerate() {
            if is_terminator(byte) {
                in_terminator = true;
            } else if in_terminator {
                self.make_line(&mut lines, &input[start..i]);
                start = i;
                in_terminator = false;
            }
        }

        if in_terminator {
            self.make_line(&mut lines, &input[start..]);
        } else {
            self.pending.extend_from_slice(&input[start..]);
        }

        lines
    }

    /// Number of bytes waiting for a terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn make_line(&mut self, lines: &mut Vec<Bytes>, span: &[u8]) {
        if span.is_empty() {
            return;
        }

        let line = if self.pending.is_empty() {
            Bytes::copy_from_slice(span)
        } else {
            self.pending.extend_from_slice(span);
            self.pending.split().freeze()
        };

        lines.push(line);
    }
}

#[inline]
fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}
