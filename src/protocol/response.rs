//! Response framing.
//!
//! Every control reply is a single `STATUS message\n` line. `Status::Success`
//! used with [`Response::download_ready`] is the one special case: the
//! `<n>` in `SUCCESS <n>` is a byte count, and exactly that many opaque
//! payload bytes follow on the wire with no trailing delimiter.

use std::fmt;

/// The three response statuses the wire protocol knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The operation completed.
    Success,
    /// The server is ready for the client to start sending data.
    Ready,
    /// The operation failed; `message` carries one of the catalogue of
    /// client-visible error strings.
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "SUCCESS",
            Status::Ready => "READY",
            Status::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A single control response line.
#[derive(Debug, Clone)]
pub struct Response {
    status: Status,
    message: String,
}

impl Response {
    /// Builds an `ERROR <message>` response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }

    /// Builds a `SUCCESS <message>` response.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
        }
    }

    /// Builds a `READY <message>` response.
    pub fn ready(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ready,
            message: message.into(),
        }
    }

    /// Builds the `SUCCESS <n>` line that precedes a DOWNLOAD payload.
    pub fn download_ready(size: u64) -> Self {
        Self {
            status: Status::Success,
            message: size.to_string(),
        }
    }

    /// Renders the response as the exact bytes to write to the socket,
    /// including the trailing newline.
    pub fn into_line(self) -> String {
        format!("{} {}\n", self.status, self.message)
    }
}
