use std::io;

use thiserror::Error;

/// Reasons an inbound envelope is refused.
///
/// The `Display` text is what the server places in the `message` field of
/// the `ERROR` packet it returns.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Bytes are not a well-formed envelope.
    #[error("Invalid JSON format: {0}")]
    MalformedEnvelope(String),
    /// Envelope lacks a `header` section.
    #[error("Invalid packet format - missing header")]
    MissingHeader,
    /// Envelope lacks a footer checksum.
    #[error("Missing checksum")]
    MissingChecksum,
    /// Footer checksum does not match the body bytes.
    #[error("Checksum validation failed")]
    ChecksumMismatch {
        /// Checksum carried in the footer.
        expected: String,
        /// Checksum computed over the received body.
        actual: String,
    },
}

impl DecodeError {
    pub(crate) fn malformed(error: &serde_json::Error) -> Self {
        Self::MalformedEnvelope(error.to_string())
    }
}

/// Errors raised while serializing an outbound packet.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// JSON serialization failed.
    #[error("failed to serialize packet: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised by the length-prefixed framing layer.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A frame exceeds the negotiated maximum.
    #[error("frame of {length} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Announced or attempted frame length.
        length: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// The peer closed the stream part-way through a frame.
    #[error("stream closed after {buffered} bytes of an incomplete frame")]
    Truncated {
        /// Bytes received before the stream ended.
        buffered: usize,
    },
    /// Underlying stream failed.
    #[error("frame I/O failed: {0}")]
    Io(#[from] io::Error),
}
