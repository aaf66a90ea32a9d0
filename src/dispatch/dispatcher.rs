//! Command dispatcher
//!
//! Routes a raw request line to the handler for its keyword.

use std::sync::Arc;

use bytes::BytesMut;

use crate::error::{LineQueueError, Result};
use crate::protocol::{Command, Response};
use crate::storage::LineQueue;

/// Callback that starts an asynchronous server stop followed by a dump
pub type ShutdownHook = Box<dyn Fn() + Send + Sync>;

/// Executes requests against the line queue
pub struct Dispatcher {
    /// Lines storage
    queue: Arc<LineQueue>,

    /// Invoked by SHUTDOWN; must return without waiting for the stop
    on_shutdown: ShutdownHook,
}

impl Dispatcher {
    pub fn new(queue: Arc<LineQueue>, on_shutdown: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            queue,
            on_shutdown: Box::new(on_shutdown),
        }
    }

    /// Execute one raw request and produce its response.
    ///
    /// Unknown keywords and invalid arguments become the `ERR\r\n` marker.
    pub fn handle_request(&self, raw: &[u8]) -> Response {
        match Command::parse(raw).and_then(|command| self.execute(command)) {
            Ok(response) => response,
            Err(e) if e.is_client_error() => {
                tracing::debug!("Rejected request {:?}: {}", String::from_utf8_lossy(raw), e);
                Response::error()
            }
            Err(e) => {
                tracing::warn!("Request {:?} failed: {}", String::from_utf8_lossy(raw), e);
                Response::error()
            }
        }
    }

    /// Execute a parsed command
    pub fn execute(&self, command: Command) -> Result<Response> {
        match command {
            Command::Put { line } => {
                self.queue.add(line);
                Ok(Response::Empty)
            }
            Command::Get { count } => {
                let lines = self.queue.poll(count).map_err(|e| match e {
                    LineQueueError::NotEnoughData { requested, available } => {
                        LineQueueError::InvalidArgument(format!(
                            "requested {} lines but only {} stored",
                            requested, available
                        ))
                    }
                    other => other,
                })?;
                let mut payload = BytesMut::with_capacity(lines.iter().map(|l| l.len()).sum());
                for line in &lines {
                    payload.extend_from_slice(line);
                }
                Ok(Response::data(payload.freeze()))
            }
            Command::Shutdown => {
                tracing::info!("SHUTDOWN requested");
                (self.on_shutdown)();
                Ok(Response::Empty)
            }
            Command::Quit => Ok(Response::Close),
        }
    }

    pub fn queue(&self) -> &Arc<LineQueue> {
        &self.queue
    }
}
