//! Response definitions
//!
//! Outcomes of executing a single request.

use bytes::Bytes;

/// Literal marker sent for every rejected request
pub const ERROR_MARKER: &[u8] = b"ERR\r\n";

/// Result of one command, as seen by the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Nothing to send; the connection stays open
    Empty,

    /// Bytes to send back in order
    Data(Bytes),

    /// Send nothing and close the connection
    Close,
}

impl Response {
    /// Create a data response, collapsing empty payloads to `Empty`
    pub fn data(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        if payload.is_empty() {
            Response::Empty
        } else {
            Response::Data(payload)
        }
    }

    /// Create the generic error response
    pub fn error() -> Self {
        Response::Data(Bytes::from_static(ERROR_MARKER))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Data(bytes) if bytes.as_ref() == ERROR_MARKER)
    }
}
