//! Request scheduler
//!
//! Hands sessions with pending requests to dispatch workers.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use dashmap::DashSet;

use crate::network::{Session, SessionId};

/// Runnable queue of sessions, deduplicated by session identity
///
/// A session sits in the runnable queue at most once at any instant, so no two
/// workers execute requests of the same connection at the same time. Workers
/// take one request per turn and re-offer the session afterwards.
pub struct Scheduler {
    /// Sessions offered and not yet marked done
    admitted: DashSet<SessionId>,

    runnable_tx: Sender<Arc<Session>>,
    runnable_rx: Receiver<Arc<Session>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (runnable_tx, runnable_rx) = channel::unbounded();
        Self {
            admitted: DashSet::new(),
            runnable_tx,
            runnable_rx,
        }
    }

    /// Admit a session; a no-op while it is already admitted.
    ///
    /// Returns whether the session was enqueued.
    pub fn offer(&self, session: &Arc<Session>) -> bool {
        if !self.admitted.insert(session.id()) {
            return false;
        }

        // Sender and receiver live in self, the channel cannot be disconnected
        let _ = self.runnable_tx.send(Arc::clone(session));
        true
    }

    /// Wait up to `timeout` for a runnable session
    pub fn poll(&self, timeout: Duration) -> Option<Arc<Session>> {
        if timeout.is_zero() {
            return self.runnable_rx.try_recv().ok();
        }
        self.runnable_rx.recv_timeout(timeout).ok()
    }

    /// Release a session so a later `offer` admits it again
    pub fn mark_done(&self, session: &Session) {
        self.admitted.remove(&session.id());
    }

    /// Sessions currently waiting in the runnable queue
    pub fn runnable_len(&self) -> usize {
        self.runnable_rx.len()
    }

    pub fn is_admitted(&self, session: &Session) -> bool {
        self.admitted.contains(&session.id())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
