//! Dispatch Module
//!
//! Executes decoded requests against the line queue.
//!
//! ## Architecture
//! ```text
//!  Session ──offer──▶ Scheduler ──poll──▶ DispatchWorker ──▶ Dispatcher ──▶ LineQueue
//!     ▲                   ▲                    │
//!     └───push_response───┼────────────────────┤
//!                         └──mark_done/offer───┘
//! ```
//!
//! Per-connection ordering comes from the scheduler admitting each session at
//! most once; different sessions run fully in parallel.

mod dispatcher;
mod scheduler;
mod worker;

pub use dispatcher::{Dispatcher, ShutdownHook};
pub use scheduler::Scheduler;
pub use worker::DispatchWorker;
