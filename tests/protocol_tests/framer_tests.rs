//! Framer Tests
//!
//! These tests verify:
//! - Lines keep their terminator run
//! - Unterminated data is held across calls
//! - CR, LF and CRLF all terminate a line
//! - The split CR / LF edge case

use bytes::Bytes;
use linequeue::protocol::LineFramer;

// =============================================================================
// Helper Functions
// =============================================================================

/// Feed every chunk through one framer and collect all lines
fn frame(chunks: &[&str]) -> Vec<Bytes> {
    let mut framer = LineFramer::new();
    chunks
        .iter()
        .flat_map(|chunk| framer.extract_completed_lines(chunk.as_bytes()))
        .collect()
}

// =============================================================================
// Single Input Tests
// =============================================================================

#[test]
fn test_crlf_line() {
    assert_eq!(frame(&["line\r\n"]), vec!["line\r\n"]);
}

#[test]
fn test_crlf_line_with_remainder() {
    assert_eq!(frame(&["line\r\n2"]), vec!["line\r\n"]);
}

#[test]
fn test_bare_cr_terminates() {
    assert_eq!(frame(&["line\r2"]), vec!["line\r"]);
}

#[test]
fn test_bare_lf_terminates() {
    assert_eq!(frame(&["line\n2"]), vec!["line\n"]);
}

#[test]
fn test_no_terminator_no_line() {
    assert!(frame(&["line2"]).is_empty());
}

#[test]
fn test_several_lines_in_one_input() {
    assert_eq!(
        frame(&["multi\r\nline\r\n in one\r\n input"]),
        vec!["multi\r\n", "line\r\n", " in one\r\n"]
    );
}

#[test]
fn test_terminator_run_stays_with_line() {
    assert_eq!(frame(&["a\r\n\r\nb\n"]), vec!["a\r\n\r\n", "b\n"]);
}

#[test]
fn test_empty_input() {
    let mut framer = LineFramer::new();
    assert!(framer.extract_completed_lines(b"").is_empty());
    assert_eq!(framer.pending_len(), 0);
}

// =============================================================================
// Multiple Input Tests
// =============================================================================

#[test]
fn test_remainder_is_held() {
    let mut framer = LineFramer::new();

    let lines = framer.extract_completed_lines(b"line\r\n2");
    assert_eq!(lines, vec!["line\r\n"]);
    assert_eq!(framer.pending_len(), 1);

    let lines = framer.extract_completed_lines(b"\r\n");
    assert_eq!(lines, vec!["2\r\n"]);
    assert_eq!(framer.pending_len(), 0);
}

#[test]
fn test_two_complete_inputs() {
    assert_eq!(
        frame(&["multi\r\n", "line\r\n"]),
        vec!["multi\r\n", "line\r\n"]
    );
}

#[test]
fn test_two_inputs_with_trailing_remainder() {
    assert_eq!(
        frame(&["multi\r\n", "line\r\n3"]),
        vec!["multi\r\n", "line\r\n"]
    );
}

#[test]
fn test_line_spanning_two_inputs() {
    let mut framer = LineFramer::new();

    assert!(framer.extract_completed_lines(b"multi ").is_empty());
    assert_eq!(framer.extract_completed_lines(b"line\r\n3"), vec!["multi line\r\n"]);
    assert_eq!(framer.pending_len(), 1);
}

#[test]
fn test_line_spanning_many_inputs() {
    assert_eq!(
        frame(&["one ", "more", " multi ", "line\r\n3"]),
        vec!["one more multi line\r\n"]
    );
}

#[test]
fn test_crlf_split_across_inputs_yields_bare_cr() {
    // The terminator run is not coalesced across calls: the CR closes the
    // first line and the stray LF comes out as a line of its own.
    assert_eq!(
        frame(&["multi\r", "\nline\r\n"]),
        vec!["multi\r", "\n", "line\r\n"]
    );
}

#[test]
fn test_non_utf8_bytes_are_kept() {
    let mut framer = LineFramer::new();

    assert!(framer.extract_completed_lines(b"a\xff").is_empty());
    let lines = framer.extract_completed_lines(b"\xfeb\r\n");

    assert_eq!(lines, vec![Bytes::from_static(b"a\xff\xfeb\r\n")]);
}
