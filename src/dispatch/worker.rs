//! Dispatch worker
//!
//! Pulls runnable sessions from the scheduler and executes their requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::network::{RequestChannel, Session};
use crate::protocol::Response;

use super::{Dispatcher, Scheduler};

/// Executes one request per scheduler turn
///
/// Requests of one session run strictly in arrival order: a session is only
/// re-offered after its current request has produced its response.
pub struct DispatchWorker {
    scheduler: Arc<Scheduler>,
    dispatcher: Arc<Dispatcher>,
    poll_timeout: Duration,
}

impl DispatchWorker {
    pub fn new(scheduler: Arc<Scheduler>, dispatcher: Arc<Dispatcher>, poll_timeout: Duration) -> Self {
        Self {
            scheduler,
            dispatcher,
            poll_timeout,
        }
    }

    /// Run until `stop` is raised and the scheduler has nothing left
    pub fn run(&self, stop: &AtomicBool) {
        tracing::debug!("Dispatch worker started");

        loop {
            let stopping = stop.load(Ordering::Acquire);
            let timeout = if stopping { Duration::ZERO } else { self.poll_timeout };

            match self.scheduler.poll(timeout) {
                Some(session) => self.run_once(&session),
                None if stopping => break,
                None => continue,
            }
        }

        tracing::info!("Execution of requests was finished");
    }

    /// Execute the next request of `session`, then hand the session back
    pub fn run_once(&self, session: &Arc<Session>) {
        if let Some(request) = session.next_request() {
            tracing::trace!("Session {} executing {:?}", session.id(), request);

            match self.dispatcher.handle_request(&request) {
                Response::Empty => {}
                Response::Data(bytes) => session.push_response(bytes),
                Response::Close => session.finish(),
            }
        }

        self.scheduler.mark_done(session);

        if session.has_pending_requests() {
            self.scheduler.offer(session);
        }
    }
}
