//! Error types surfaced by the client.

use std::io;
use std::time::Duration;

use thiserror::Error;

use prepper_protocol::{DecodeError, EncodeError, FrameError};

/// Failures of a single request/response exchange.
///
/// Every variant leaves the client disconnected; the next request dials a
/// fresh socket.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured host did not resolve to a socket address.
    #[error("failed to resolve server address {endpoint}: {source}")]
    Resolve {
        /// Endpoint as configured.
        endpoint: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// The TCP connection could not be established.
    #[error("failed to connect to server at {endpoint}: {source}")]
    Connect {
        /// Endpoint as configured.
        endpoint: String,
        /// Socket error.
        #[source]
        source: io::Error,
    },
    /// No response arrived within the request timeout.
    #[error("no response from server within {after:?}")]
    Timeout {
        /// Timeout that elapsed.
        after: Duration,
    },
    /// The server closed the connection before a full response arrived.
    #[error("connection closed by server")]
    Closed,
    /// The response frame is larger than the client accepts.
    #[error("response of {length} bytes exceeds the {limit} byte limit")]
    Oversized {
        /// Announced frame length.
        length: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// The response envelope failed validation.
    #[error("invalid response: {0}")]
    Decode(#[from] DecodeError),
    /// The request could not be serialized or framed.
    #[error("failed to encode request: {0}")]
    Encode(#[from] EncodeError),
    /// Any other socket failure.
    #[error("socket error: {0}")]
    Io(#[source] io::Error),
}

impl ClientError {
    /// Classifies a framing failure seen while talking to the server.
    pub(crate) fn from_frame(error: FrameError, timeout: Duration) -> Self {
        match error {
            FrameError::TooLarge { length, limit } => Self::Oversized { length, limit },
            FrameError::Truncated { .. } => Self::Closed,
            FrameError::Io(source) => Self::from_io(source, timeout),
        }
    }

    fn from_io(source: io::Error, timeout: Duration) -> Self {
        match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Timeout { after: timeout },
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Closed,
            _ => Self::Io(source),
        }
    }

    /// Returns `true` when the server could not be reached at all.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Resolve { .. } | Self::Connect { .. })
    }
}
