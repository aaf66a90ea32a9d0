//! Command definitions
//!
//! Keyword registry and request parsing for the text protocol.

use std::fmt;

use bytes::Bytes;

use crate::error::{LineQueueError, Result};

/// Command keywords understood by the server (case-sensitive, exact match)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Put,
    Get,
    Shutdown,
    Quit,
}

impl CommandKind {
    /// Every known command, in registry order
    pub const ALL: [CommandKind; 4] = [
        CommandKind::Put,
        CommandKind::Get,
        CommandKind::Shutdown,
        CommandKind::Quit,
    ];

    /// Look up a keyword in the registry
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "PUT" => Some(CommandKind::Put),
            "GET" => Some(CommandKind::Get),
            "SHUTDOWN" => Some(CommandKind::Shutdown),
            "QUIT" => Some(CommandKind::Quit),
            _ => None,
        }
    }

    /// The wire keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            CommandKind::Put => "PUT",
            CommandKind::Get => "GET",
            CommandKind::Shutdown => "SHUTDOWN",
            CommandKind::Quit => "QUIT",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a line verbatim (terminator bytes included)
    Put { line: Bytes },

    /// Take the next `count` lines
    Get { count: usize },

    /// Stop the server and dump the queue
    Shutdown,

    /// Close this connection
    Quit,
}

impl Command {
    /// Parse a raw request line.
    ///
    /// The keyword ends at the first space; everything after that space is the
    /// payload, kept byte for byte. A request without a space is a bare keyword
    /// (trimmed).
    pub fn parse(raw: impl AsRef<[u8]>) -> Result<Self> {
        let (keyword, payload) = split_request(raw.as_ref());

        let kind = std::str::from_utf8(keyword)
            .ok()
            .and_then(CommandKind::from_keyword)
            .ok_or_else(|| {
                LineQueueError::UnknownCommand(String::from_utf8_lossy(keyword).into_owned())
            })?;

        match kind {
            CommandKind::Put => {
                let line = payload.ok_or_else(|| {
                    LineQueueError::InvalidArgument("PUT requires a line to store".to_string())
                })?;
                Ok(Command::Put { line: Bytes::copy_from_slice(line) })
            }
            CommandKind::Get => {
                let payload = payload.ok_or_else(|| {
                    LineQueueError::InvalidArgument("GET requires a line count".to_string())
                })?;
                let text = String::from_utf8_lossy(payload);
                let count = text.trim().parse::<usize>().map_err(|e| {
                    LineQueueError::InvalidArgument(format!(
                        "GET count {:?} is not a non-negative integer: {}",
                        text.trim(),
                        e
                    ))
                })?;
                Ok(Command::Get { count })
            }
            CommandKind::Shutdown => Ok(Command::Shutdown),
            CommandKind::Quit => Ok(Command::Quit),
        }
    }

    /// Get the command kind
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Put { .. } => CommandKind::Put,
            Command::Get { .. } => CommandKind::Get,
            Command::Shutdown => CommandKind::Shutdown,
            Command::Quit => CommandKind::Quit,
        }
    }

    /// Encode as a request line for the wire.
    ///
    /// A PUT line that already ends in CR or LF is sent as is; anything else
    /// gets a CRLF appended.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = match self {
            Command::Put { line } => [&b"PUT "[..], &line[..]].concat(),
            Command::Get { count } => format!("GET {}", count).into_bytes(),
            Command::Shutdown => b"SHUTDOWN".to_vec(),
            Command::Quit => b"QUIT".to_vec(),
        };

        if !matches!(out.last(), Some(b'\r') | Some(b'\n')) {
            out.extend_from_slice(b"\r\n");
        }

        out
    }
}

/// Split a raw request at the first space into keyword and payload.
///
/// `None` payload means the request contained no space at all.
pub fn split_request(raw: &[u8]) -> (&[u8], Option<&[u8]>) {
    match raw.iter().position(|&b| b == b' ') {
        Some(index) => (&raw[..index], Some(&raw[index + 1..])),
        None => (raw.trim_ascii(), None),
    }
}
