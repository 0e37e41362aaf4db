//! Errors that end a single client connection.

use std::io;
use std::time::Duration;

use thiserror::Error;

use prepper_protocol::{EncodeError, FrameError};

/// Fatal conditions for one connection. Other connections are unaffected.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Reading from or writing to the socket failed.
    #[error("connection I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The peer announced a frame above the configured limit.
    #[error("framing failed: {0}")]
    Frame(#[from] FrameError),
    /// A response could not be serialized.
    #[error("failed to encode response: {0}")]
    Encode(#[from] EncodeError),
    /// The peer sent nothing for longer than the idle timeout.
    #[error("connection idle for more than {}s", .after.as_secs())]
    IdleTimeout {
        /// Configured idle limit.
        after: Duration,
    },
}
