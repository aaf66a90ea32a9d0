//! Session
//!
//! Per-connection bridge between raw socket bytes and protocol requests.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;

use crate::dispatch::Scheduler;
use crate::protocol::LineFramer;

/// Capacity of the per-connection transmit buffer
pub const TRANSMIT_BUFFER_SIZE: usize = 1024;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identity of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback telling the owning I/O loop that output is pending
pub type ResponseNotifier = Box<dyn Fn() + Send + Sync>;

/// Outcome of pushing buffered output into a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Everything buffered was written
    Idle,

    /// The socket would block with output still buffered
    Blocked,

    /// The session is terminal; close the connection
    Closed,
}

/// Byte-level side of a session, driven by the I/O loop
pub trait ByteChannel {
    /// Feed bytes read from the socket
    fn bytes_received(self: &Arc<Self>, bytes: &[u8]);

    /// Write as much buffered output as `sink` accepts
    fn flush_to(&self, sink: &mut dyn Write) -> io::Result<FlushStatus>;

    /// Whether output is still waiting to be written
    fn has_pending_output(&self) -> bool;
}

/// Request-level side of a session, driven by dispatch workers
pub trait RequestChannel {
    /// Pop the oldest decoded request
    fn next_request(&self) -> Option<Bytes>;

    /// Whether decoded requests are waiting to execute
    fn has_pending_requests(&self) -> bool;

    /// Queue an encoded response for writing
    fn push_response(&self, bytes: Bytes);

    /// Mark the session terminal; the connection closes without further output
    fn finish(&self);
}

/// State of one client connection
pub struct Session {
    id: SessionId,

    /// Splits inbound bytes into request lines
    framer: Mutex<LineFramer>,

    /// Decoded requests not yet executed, oldest first
    requests: SegQueue<Bytes>,

    /// Encoded responses not yet copied to the transmit buffer, oldest first
    responses: Mutex<VecDeque<Bytes>>,

    /// Bytes staged for the socket; partially written data stays at the front
    transmit: Mutex<BytesMut>,

    /// Set by QUIT
    finished: AtomicBool,

    /// Where the session is offered when requests arrive
    scheduler: Arc<Scheduler>,

    /// Wakes the owning I/O loop when output is pending
    notify_output: ResponseNotifier,
}

impl Session {
    pub fn new(id: SessionId, scheduler: Arc<Scheduler>, notify_output: ResponseNotifier) -> Self {
        Self {
            id,
            framer: Mutex::new(LineFramer::new()),
            requests: SegQueue::new(),
            responses: Mutex::new(VecDeque::new()),
            transmit: Mutex::new(BytesMut::with_capacity(TRANSMIT_BUFFER_SIZE)),
            finished: AtomicBool::new(false),
            scheduler,
            notify_output,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Top up the transmit buffer from the response queue
    fn refill(&self, transmit: &mut BytesMut) {
        let mut responses = self.responses.lock();

        while transmit.len() < TRANSMIT_BUFFER_SIZE {
            let Some(chunk) = responses.front_mut() else {
                break;
            };

            let take = (TRANSMIT_BUFFER_SIZE - transmit.len()).min(chunk.len());
            transmit.extend_from_slice(&chunk.split_to(take));

            if chunk.is_empty() {
                responses.pop_front();
            }
        }
    }
}

impl ByteChannel for Session {
    fn bytes_received(self: &Arc<Self>, bytes: &[u8]) {
        let lines = self.framer.lock().extract_completed_lines(bytes);
        if lines.is_empty() {
            return;
        }

        tracing::trace!("Session {} decoded {} requests", self.id, lines.len());
        for line in lines {
            self.requests.push(line);
        }

        self.scheduler.offer(self);
    }

    fn flush_to(&self, sink: &mut dyn Write) -> io::Result<FlushStatus> {
        if self.is_finished() {
            return Ok(FlushStatus::Closed);
        }

        let mut transmit = self.transmit.lock();
        loop {
            self.refill(&mut transmit);
            if transmit.is_empty() {
                return Ok(FlushStatus::Idle);
            }

            match sink.write(&transmit) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection stopped accepting data",
                    ))
                }
                Ok(n) => transmit.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(FlushStatus::Blocked),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn has_pending_output(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        let staged = !self.transmit.lock().is_empty();
        staged || !self.responses.lock().is_empty()
    }
}

impl RequestChannel for Session {
    fn next_request(&self) -> Option<Bytes> {
        if self.is_finished() {
            return None;
        }
        self.requests.pop()
    }

    fn has_pending_requests(&self) -> bool {
        !self.is_finished() && !self.requests.is_empty()
    }

    fn push_response(&self, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }
        self.responses.lock().push_back(bytes);
        (self.notify_output)();
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::Release);
        (self.notify_output)();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("pending_requests", &self.requests.len())
            .field("finished", &self.is_finished())
            .finish()
    }
}
