//! Tests for dump and restore
//!
//! These tests verify:
//! - Unread lines survive a dump / restore cycle in order
//! - The dump file is consumed by restore, even when it is corrupted
//! - A missing dump restores nothing

use std::fs;
use std::path::PathBuf;

use linequeue::storage::{DumpWriter, LENGTH_PREFIX_SIZE};
use linequeue::{LineQueue, LineQueueError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn dump_path(dir: &TempDir) -> PathBuf {
    dir.path().join("line_queue.dump")
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_dump_then_restore_keeps_order() {
    let dir = TempDir::new().unwrap();
    let path = dump_path(&dir);

    let queue = LineQueue::new(&path);
    queue.add("a");
    queue.add("b");
    queue.add("c");
    assert_eq!(queue.dump().unwrap(), 3);
    assert!(path.exists());

    let restored = LineQueue::new(&path);
    assert_eq!(restored.restore().unwrap(), 3);
    assert_eq!(restored.poll(3).unwrap(), vec!["a", "b", "c"]);

    // Restore consumes the file
    assert!(!path.exists());
}

#[test]
fn test_dump_skips_consumed_lines() {
    let dir = TempDir::new().unwrap();
    let path = dump_path(&dir);

    let queue = LineQueue::new(&path);
    for line in ["1\r\n", "2\r\n", "3\r\n", "4\r\n"] {
        queue.add(line);
    }
    queue.poll(2).unwrap();
    assert_eq!(queue.dump().unwrap(), 2);

    let restored = LineQueue::new(&path);
    restored.restore().unwrap();
    assert_eq!(restored.poll(2).unwrap().concat(), b"3\r\n4\r\n");
    assert!(restored.poll(1).is_err());
}

#[test]
fn test_dump_of_empty_queue() {
    let dir = TempDir::new().unwrap();
    let path = dump_path(&dir);

    let queue = LineQueue::new(&path);
    assert_eq!(queue.dump().unwrap(), 0);
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);

    let restored = LineQueue::new(&path);
    assert_eq!(restored.restore().unwrap(), 0);
    assert!(restored.is_empty());
    assert!(!path.exists());
}

#[test]
fn test_dump_rewrites_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dump_path(&dir);

    let queue = LineQueue::new(&path);
    queue.add("first dump line, quite a bit longer than the second");
    queue.dump().unwrap();

    queue.poll(1).unwrap();
    queue.add("x");
    queue.dump().unwrap();

    let expected_len = (LENGTH_PREFIX_SIZE + 1) as u64;
    assert_eq!(fs::metadata(&path).unwrap().len(), expected_len);

    let restored = LineQueue::new(&path);
    restored.restore().unwrap();
    assert_eq!(restored.poll(1).unwrap(), vec!["x"]);
}

#[test]
fn test_dump_keeps_non_utf8_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dump_path(&dir);
    let line: &[u8] = b"\xff\xfe raw \x00\r\n";

    let queue = LineQueue::new(&path);
    queue.add(line.to_vec());
    queue.dump().unwrap();

    let restored = LineQueue::new(&path);
    restored.restore().unwrap();
    assert_eq!(restored.poll(1).unwrap(), vec![line]);
}

#[test]
fn test_restored_lines_append_after_existing_ones() {
    let dir = TempDir::new().unwrap();
    let path = dump_path(&dir);

    let queue = LineQueue::new(&path);
    queue.add("from dump");
    queue.dump().unwrap();

    let restored = LineQueue::new(&path);
    restored.add("already here");
    restored.restore().unwrap();
    assert_eq!(restored.poll(2).unwrap(), vec!["already here", "from dump"]);
}

// =============================================================================
// Missing / Corrupted Dump Tests
// =============================================================================

#[test]
fn test_restore_without_dump_file() {
    let dir = TempDir::new().unwrap();
    let queue = LineQueue::new(dump_path(&dir));

    assert_eq!(queue.restore().unwrap(), 0);
    assert!(queue.is_empty());
}

#[test]
fn test_restore_truncated_record_fails_and_deletes_file() {
    let dir = TempDir::new().unwrap();
    let path = dump_path(&dir);

    // One good record, then a prefix announcing 10 bytes followed by only 3
    let mut writer = DumpWriter::new(Vec::new());
    writer.write_record(b"good").unwrap();
    let mut bytes = writer.finish().unwrap();
    bytes.extend_from_slice(&10u32.to_be_bytes());
    bytes.extend_from_slice(b"bad");
    fs::write(&path, bytes).unwrap();

    let queue = LineQueue::new(&path);
    match queue.restore() {
        Err(LineQueueError::DumpCorrupted { expected, read }) => {
            assert_eq!(expected, 10);
            assert_eq!(read, 3);
        }
        other => panic!("Expected DumpCorrupted, got {:?}", other),
    }

    assert!(!path.exists());

    // Records before the damage were loaded
    assert_eq!(queue.poll(1).unwrap(), vec!["good"]);
}

#[test]
fn test_restore_truncated_prefix_fails() {
    let dir = TempDir::new().unwrap();
    let path = dump_path(&dir);
    fs::write(&path, [0u8, 0, 1]).unwrap();

    let queue = LineQueue::new(&path);
    assert!(queue.restore().is_err());
    assert!(!path.exists());
    assert!(queue.is_empty());
}
