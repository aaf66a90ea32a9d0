//! Connection acceptor
//!
//! Non-blocking accept loop handing new connections to the I/O loops.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};

use crate::error::{LineQueueError, Result};

use super::multiplexer::MultiplexerHandle;

const LISTENER_TOKEN: Token = Token(0);
const WAKE_TOKEN: Token = Token(1);

/// Accepts inbound connections and distributes them round-robin
pub struct Acceptor {
    poll: Poll,
    listener: TcpListener,
    waker: Arc<Waker>,
    targets: Vec<MultiplexerHandle>,
    next_target: usize,
    poll_timeout: Duration,
}

impl Acceptor {
    /// Wrap a bound listener.
    ///
    /// Several acceptors may share clones of the same listener.
    pub fn new(
        listener: std::net::TcpListener,
        targets: Vec<MultiplexerHandle>,
        poll_timeout: Duration,
    ) -> Result<Self> {
        if targets.is_empty() {
            return Err(LineQueueError::Network(
                "acceptor needs at least one I/O worker".to_string(),
            ));
        }

        listener.set_nonblocking(true)?;
        let mut listener = TcpListener::from_std(listener);

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);

        Ok(Self {
            poll,
            listener,
            waker,
            targets,
            next_target: 0,
            poll_timeout,
        })
    }

    /// Waker that breaks the loop out of its readiness wait
    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }

    /// Accept connections until `stop` is raised
    pub fn run(mut self, stop: &AtomicBool) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!("Server bind to address :: {}", addr);
        }

        let mut events = Events::with_capacity(128);

        while !stop.load(Ordering::Acquire) {
            if let Err(e) = self.poll.poll(&mut events, Some(self.poll_timeout)) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            let acceptable = events.iter().any(|event| event.token() == LISTENER_TOKEN);
            if acceptable {
                self.accept_pending();
            }
        }

        tracing::info!("Handling of incoming connection was finished");
        Ok(())
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer_addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!("Failed to disable Nagle for {}: {}", peer_addr, e);
                    }

                    let target = &self.targets[self.next_target % self.targets.len()];
                    self.next_target = self.next_target.wrapping_add(1);
                    target.register(stream);

                    tracing::info!("New connection request was received from client :: {}", peer_addr);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Accepting connection failed: {}", e);
                    break;
                }
            }
        }
    }
}
