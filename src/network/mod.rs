//! Network Module
//!
//! Non-blocking TCP serving.
//!
//! ## Architecture
//! - Acceptor loops hand accepted connections to I/O loops (round-robin)
//! - Each I/O loop owns its connections and their sessions
//! - Sessions decode requests and offer themselves to the scheduler
//! - Dispatch workers push responses back; the owning I/O loop writes them
//!
//! Cross-thread changes to a loop (new connection, output ready) travel
//! through its deferred-change inbox followed by a wakeup.

mod acceptor;
mod multiplexer;
mod pool;
mod server;
mod session;

pub use acceptor::Acceptor;
pub use multiplexer::{Change, Multiplexer, MultiplexerHandle};
pub use pool::WorkerPool;
pub use server::Server;
pub use session::{
    ByteChannel, FlushStatus, RequestChannel, ResponseNotifier, Session, SessionId,
    TRANSMIT_BUFFER_SIZE,
};
