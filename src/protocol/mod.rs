//! Protocol Module
//!
//! Defines the line-oriented text protocol between clients and the server.
//!
//! ## Requests
//! ```text
//! PUT <text>\r\n     store <text>\r\n verbatim, no response
//! GET <n>\r\n        next n lines concatenated, or ERR\r\n
//! SHUTDOWN\r\n       stop serving and dump the queue, no response
//! QUIT\r\n           close this connection, no response
//! ```
//!
//! Any unknown keyword or malformed payload is answered with `ERR\r\n`.
//! Lines may end in CR, LF or any run of them.

mod command;
mod framer;
mod response;

pub use command::{split_request, Command, CommandKind};
pub use framer::LineFramer;
pub use response::{Response, ERROR_MARKER};
