//! Tests for Scheduler and DispatchWorker
//!
//! These tests verify:
//! - A session is runnable at most once at a time
//! - Workers execute one session's requests in arrival order
//! - A stopping worker drains what is still runnable

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use linequeue::dispatch::{DispatchWorker, Dispatcher, Scheduler};
use linequeue::network::{ByteChannel, FlushStatus, RequestChannel, Session, SessionId};
use linequeue::LineQueue;

// =============================================================================
// Helper Functions
// =============================================================================

fn new_session(scheduler: &Arc<Scheduler>) -> Arc<Session> {
    Arc::new(Session::new(SessionId::next(), Arc::clone(scheduler), Box::new(|| {})))
}

fn new_worker(scheduler: &Arc<Scheduler>) -> DispatchWorker {
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(LineQueue::new("unused.dump")), || {}));
    DispatchWorker::new(Arc::clone(scheduler), dispatcher, Duration::from_millis(10))
}

fn drain_output(session: &Session) -> Vec<u8> {
    let mut out = Vec::new();
    assert_eq!(session.flush_to(&mut out).unwrap(), FlushStatus::Idle);
    out
}

// =============================================================================
// Scheduler Tests
// =============================================================================

#[test]
fn test_offer_is_idempotent_while_admitted() {
    let scheduler = Arc::new(Scheduler::new());
    let session = new_session(&scheduler);

    assert!(scheduler.offer(&session));
    assert!(!scheduler.offer(&session));
    assert_eq!(scheduler.runnable_len(), 1);
    assert!(scheduler.is_admitted(&session));

    let polled = scheduler.poll(Duration::ZERO).unwrap();
    assert_eq!(polled.id(), session.id());

    // Still admitted until marked done
    assert!(!scheduler.offer(&session));
    scheduler.mark_done(&session);
    assert!(!scheduler.is_admitted(&session));
    assert!(scheduler.offer(&session));
}

#[test]
fn test_distinct_sessions_are_both_runnable() {
    let scheduler = Arc::new(Scheduler::new());
    let first = new_session(&scheduler);
    let second = new_session(&scheduler);

    assert!(scheduler.offer(&first));
    assert!(scheduler.offer(&second));
    assert_eq!(scheduler.runnable_len(), 2);

    assert_eq!(scheduler.poll(Duration::ZERO).unwrap().id(), first.id());
    assert_eq!(scheduler.poll(Duration::ZERO).unwrap().id(), second.id());
}

#[test]
fn test_poll_times_out_when_empty() {
    let scheduler = Scheduler::new();

    let start = Instant::now();
    assert!(scheduler.poll(Duration::from_millis(50)).is_none());
    assert!(start.elapsed() >= Duration::from_millis(40));

    assert!(scheduler.poll(Duration::ZERO).is_none());
}

#[test]
fn test_received_lines_offer_the_session() {
    let scheduler = Arc::new(Scheduler::new());
    let session = new_session(&scheduler);

    // Incomplete line: nothing to run yet
    session.bytes_received(b"PUT a");
    assert_eq!(scheduler.runnable_len(), 0);

    session.bytes_received(b"\r\nPUT b\r\n");
    assert_eq!(scheduler.runnable_len(), 1);
    assert!(session.has_pending_requests());
}

// =============================================================================
// Worker Tests
// =============================================================================

#[test]
fn test_worker_runs_one_request_per_turn_in_order() {
    let scheduler = Arc::new(Scheduler::new());
    let worker = new_worker(&scheduler);
    let session = new_session(&scheduler);

    session.bytes_received(b"PUT a\r\nPUT b\r\nGET 2\r\n");

    let mut turns = 0;
    while let Some(runnable) = scheduler.poll(Duration::ZERO) {
        worker.run_once(&runnable);
        turns += 1;
    }

    assert_eq!(turns, 3);
    assert!(!session.has_pending_requests());
    assert!(!scheduler.is_admitted(&session));
    assert_eq!(drain_output(&session), b"a\r\nb\r\n");
}

#[test]
fn test_worker_answers_errors_in_order() {
    let scheduler = Arc::new(Scheduler::new());
    let worker = new_worker(&scheduler);
    let session = new_session(&scheduler);

    session.bytes_received(b"GET 1\r\nPUT x\r\nGET 1\r\nBOGUS\r\n");
    while let Some(runnable) = scheduler.poll(Duration::ZERO) {
        worker.run_once(&runnable);
    }

    assert_eq!(drain_output(&session), b"ERR\r\nx\r\nERR\r\n");
}

#[test]
fn test_quit_drops_later_requests() {
    let scheduler = Arc::new(Scheduler::new());
    let worker = new_worker(&scheduler);
    let session = new_session(&scheduler);

    session.bytes_received(b"QUIT\r\nPUT never\r\n");
    while let Some(runnable) = scheduler.poll(Duration::ZERO) {
        worker.run_once(&runnable);
    }

    assert!(session.is_finished());
    assert!(!session.has_pending_requests());
    let mut out = Vec::new();
    assert_eq!(session.flush_to(&mut out).unwrap(), FlushStatus::Closed);
    assert!(out.is_empty());
}

#[test]
fn test_stopping_worker_drains_runnable_sessions() {
    let scheduler = Arc::new(Scheduler::new());
    let worker = new_worker(&scheduler);
    let session = new_session(&scheduler);

    session.bytes_received(b"PUT 1\r\nPUT 2\r\nGET 2\r\n");

    // Already stopped: the worker must still finish the pending work, then return
    let stop = AtomicBool::new(true);
    worker.run(&stop);

    assert_eq!(scheduler.runnable_len(), 0);
    assert_eq!(drain_output(&session), b"1\r\n2\r\n");
}
