//! I/O multiplexer
//!
//! Single-threaded, non-blocking read/write loop over a set of connections.

use std::collections::HashMap;
use std::io::{self, Read};
use std::net::Shutdown;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token, Waker};

use crate::dispatch::Scheduler;
use crate::error::Result;

use super::session::{ByteChannel, FlushStatus, Session, SessionId};

/// Token reserved for the cross-thread waker
const WAKE_TOKEN: Token = Token(0);

/// Size of the buffer each socket read goes through
const READ_BUFFER_SIZE: usize = 1024;

/// Readiness events handled per wait
const EVENTS_CAPACITY: usize = 1024;

/// Change requested by another thread, applied on the loop's own thread
#[derive(Debug)]
pub enum Change {
    /// Start serving a freshly accepted connection
    Register(TcpStream),

    /// A session has output pending
    EnableWrite(Token),
}

/// Cloneable handle other threads use to reach a multiplexer
#[derive(Clone)]
pub struct MultiplexerHandle {
    changes: Sender<Change>,
    waker: Arc<Waker>,
}

impl MultiplexerHandle {
    /// Hand a non-blocking connection to the loop
    pub fn register(&self, stream: TcpStream) {
        self.submit(Change::Register(stream));
    }

    /// Ask the loop to flush the connection behind `token`
    pub fn enable_write(&self, token: Token) {
        self.submit(Change::EnableWrite(token));
    }

    /// Break the loop out of its readiness wait
    pub fn wake(&self) -> io::Result<()> {
        self.waker.wake()
    }

    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }

    fn submit(&self, change: Change) {
        if self.changes.send(change).is_err() {
            tracing::debug!("I/O worker already stopped, dropping change");
            return;
        }
        if let Err(e) = self.waker.wake() {
            tracing::debug!("Failed to wake I/O worker: {}", e);
        }
    }
}

/// A connection owned by the loop
struct Connection {
    stream: TcpStream,
    session: Arc<Session>,
    peer_addr: String,

    /// Whether WRITABLE is part of the registered interest
    write_interest: bool,
}

/// Event loop reading sockets into sessions and writing session output back
///
/// Registration state is only touched on the loop's thread; other threads go
/// through [`MultiplexerHandle`].
pub struct Multiplexer {
    poll: Poll,
    changes: Receiver<Change>,
    handle: MultiplexerHandle,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    scheduler: Arc<Scheduler>,
    read_buffer: Vec<u8>,
    poll_timeout: Duration,
}

impl Multiplexer {
    pub fn new(scheduler: Arc<Scheduler>, poll_timeout: Duration) -> Result<Self> {
        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
        let (changes_tx, changes_rx) = channel::unbounded();

        Ok(Self {
            poll,
            changes: changes_rx,
            handle: MultiplexerHandle {
                changes: changes_tx,
                waker,
            },
            connections: HashMap::new(),
            next_token: WAKE_TOKEN.0 + 1,
            scheduler,
            read_buffer: vec![0u8; READ_BUFFER_SIZE],
            poll_timeout,
        })
    }

    pub fn handle(&self) -> MultiplexerHandle {
        self.handle.clone()
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Run until `stop` is raised, then close every owned connection
    pub fn run(mut self, stop: &AtomicBool) -> Result<()> {
        tracing::info!("Read-write socket worker started");
        let result = self.event_loop(stop);
        self.close_all();
        tracing::info!("Read-write to the socket was finished");
        result
    }

    fn event_loop(&mut self, stop: &AtomicBool) -> Result<()> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);

        while !stop.load(Ordering::Acquire) {
            self.apply_changes();

            if let Err(e) = self.poll.poll(&mut events, Some(self.poll_timeout)) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            for event in events.iter() {
                let token = event.token();
                if token == WAKE_TOKEN {
                    continue;
                }

                if event.is_readable() || event.is_read_closed() || event.is_error() {
                    self.read(token);
                }
                if event.is_writable() {
                    self.flush(token);
                }
            }
        }

        Ok(())
    }

    fn apply_changes(&mut self) {
        let changes: Vec<Change> = self.changes.try_iter().collect();

        for change in changes {
            match change {
                Change::Register(stream) => self.register(stream),
                Change::EnableWrite(token) => self.flush(token),
            }
        }
    }

    fn register(&mut self, mut stream: TcpStream) {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let token = Token(self.next_token);
        self.next_token += 1;

        if let Err(e) = self
            .poll
            .registry()
            .register(&mut stream, token, Interest::READABLE)
        {
            tracing::warn!("Registration of connection {} failed: {}", peer_addr, e);
            return;
        }

        let handle = self.handle.clone();
        let session = Arc::new(Session::new(
            SessionId::next(),
            Arc::clone(&self.scheduler),
            Box::new(move || handle.enable_write(token)),
        ));

        tracing::info!("New connection established :: {} (session {})", peer_addr, session.id());

        self.connections.insert(
            token,
            Connection {
                stream,
                session,
                peer_addr,
                write_interest: false,
            },
        );
    }

    /// Drain the socket into its session
    fn read(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };

        let mut close = false;
        loop {
            match conn.stream.read(&mut self.read_buffer) {
                Ok(0) => {
                    close = true;
                    break;
                }
                Ok(n) => conn.session.bytes_received(&self.read_buffer[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("Read from {} failed: {}", conn.peer_addr, e);
                    close = true;
                    break;
                }
            }
        }

        if close {
            self.close(token);
        }
    }

    /// Write pending session output and adjust write interest
    fn flush(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };

        let want_write = match conn.session.flush_to(&mut conn.stream) {
            Ok(FlushStatus::Idle) => false,
            Ok(FlushStatus::Blocked) => true,
            Ok(FlushStatus::Closed) => {
                self.close(token);
                return;
            }
            Err(e) => {
                tracing::debug!("Write to {} failed: {}", conn.peer_addr, e);
                self.close(token);
                return;
            }
        };

        if conn.write_interest != want_write {
            let interest = if want_write {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };

            if let Err(e) = self.poll.registry().reregister(&mut conn.stream, token, interest) {
                tracing::warn!("Changing interest of {} failed: {}", conn.peer_addr, e);
                self.close(token);
                return;
            }
            conn.write_interest = want_write;
        }
    }

    fn close(&mut self, token: Token) {
        let Some(mut conn) = self.connections.remove(&token) else {
            return;
        };

        if let Err(e) = self.poll.registry().deregister(&mut conn.stream) {
            tracing::debug!("Deregistering {} failed: {}", conn.peer_addr, e);
        }
        if let Err(e) = conn.stream.shutdown(Shutdown::Both) {
            tracing::debug!("Shutting down {} failed: {}", conn.peer_addr, e);
        }

        tracing::info!("Connection is closed :: {} (session {})", conn.peer_addr, conn.session.id());
    }

    fn close_all(&mut self) {
        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        for token in tokens {
            self.close(token);
        }
    }
}
