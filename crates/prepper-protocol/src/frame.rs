//! Length-prefixed framing.
//!
//! A frame is a four byte unsigned big-endian length followed by exactly that
//! many bytes of envelope JSON. Length prefixes let a reader find message
//! boundaries on a stream that may split or coalesce writes arbitrarily.

use std::io::{self, Read, Write};

use crate::error::FrameError;

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_LEN: usize = 4;

/// Prefixes `payload` with its length.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] when the payload exceeds `max_len` or
/// cannot be described by the prefix.
pub fn encode_frame(payload: &[u8], max_len: usize) -> Result<Vec<u8>, FrameError> {
    let prefix = length_prefix(payload.len(), max_len)?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&prefix);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Writes one frame and flushes the writer.
///
/// # Errors
///
/// Returns [`FrameError`] when the payload is oversized or the write fails.
pub fn write_frame<W: Write>(
    writer: &mut W,
    payload: &[u8],
    max_len: usize,
) -> Result<(), FrameError> {
    let frame = encode_frame(payload, max_len)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Blocks until one complete frame has been read and returns its payload.
///
/// # Errors
///
/// Returns [`FrameError::Io`] when the stream fails or closes before a prefix
/// arrives, [`FrameError::Truncated`] when it closes part-way through the
/// payload, and [`FrameError::TooLarge`] when the announced length exceeds
/// `max_len`.
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<Vec<u8>, FrameError> {
    let mut prefix = [0_u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut prefix)?;
    let length = announced_length(prefix, max_len)?;

    let mut payload = Vec::with_capacity(length);
    let received = reader
        .take(u64::try_from(length).unwrap_or(u64::MAX))
        .read_to_end(&mut payload)?;
    if received < length {
        return Err(FrameError::Truncated { buffered: received });
    }
    Ok(payload)
}

/// Incremental decoder that reassembles frames from arbitrary read chunks.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_len: usize,
}

impl FrameDecoder {
    /// Creates a decoder that refuses frames longer than `max_len` bytes.
    #[must_use]
    pub const fn new(max_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_len,
        }
    }

    /// Appends bytes read from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of bytes waiting for the rest of their frame.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Consumes the decoder at end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Truncated`] when a partial frame was left over.
    pub fn finish(self) -> Result<(), FrameError> {
        match self.buffer.len() {
            0 => Ok(()),
            buffered => Err(FrameError::Truncated { buffered }),
        }
    }

    /// Removes and returns the next complete frame, or `None` until more
    /// bytes arrive.
    ///
    /// Frames come out in arrival order, so every frame buffered ahead of an
    /// oversized prefix is yielded before that prefix is reported.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] once the next prefix announces an
    /// oversized frame. The decoder should be discarded afterwards.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let Some(prefix) = self
            .buffer
            .get(..FRAME_HEADER_LEN)
            .and_then(|bytes| <[u8; FRAME_HEADER_LEN]>::try_from(bytes).ok())
        else {
            return Ok(None);
        };
        let length = announced_length(prefix, self.max_len)?;
        let end = FRAME_HEADER_LEN + length;
        if self.buffer.len() < end {
            return Ok(None);
        }
        let mut frame: Vec<u8> = self.buffer.drain(..end).collect();
        frame.drain(..FRAME_HEADER_LEN);
        Ok(Some(frame))
    }
}

#[expect(
    clippy::big_endian_bytes,
    reason = "the wire format fixes network byte order"
)]
fn length_prefix(length: usize, max_len: usize) -> Result<[u8; FRAME_HEADER_LEN], FrameError> {
    let too_large = || FrameError::TooLarge {
        length,
        limit: max_len,
    };
    if length > max_len {
        return Err(too_large());
    }
    u32::try_from(length)
        .map(u32::to_be_bytes)
        .map_err(|_| too_large())
}

#[expect(
    clippy::big_endian_bytes,
    reason = "the wire format fixes network byte order"
)]
fn announced_length(prefix: [u8; FRAME_HEADER_LEN], max_len: usize) -> Result<usize, FrameError> {
    let announced = u32::from_be_bytes(prefix);
    let length = usize::try_from(announced).map_err(|_| FrameError::TooLarge {
        length: usize::MAX,
        limit: max_len,
    })?;
    if length > max_len {
        return Err(FrameError::TooLarge {
            length,
            limit: max_len,
        });
    }
    Ok(length)
}

impl From<FrameError> for io::Error {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Io(inner) => inner,
            other => Self::new(io::ErrorKind::InvalidData, other),
        }
    }
}
