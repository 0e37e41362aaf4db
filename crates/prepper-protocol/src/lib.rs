//! Wire format shared by the Prepper server and client.
//!
//! Every message is a JSON envelope with three sections:
//!
//! ```json
//! {"header":{"source":"CLIENT","destination":"SERVER","size":42,"sequence_number":1},
//!  "body":{"command":"PING","data":{"timestamp":1000.0}},
//!  "footer":{"checksum":"<md5 of the body bytes>"}}
//! ```
//!
//! The footer checksum is the MD5 digest of the body exactly as it appears on
//! the wire, so a receiver validates integrity without re-serializing.
//! Envelopes travel inside length-prefixed frames (see [`frame`]) so partial
//! reads and back-to-back messages on one socket are handled deterministically.
//!
//! Sequence numbers are advisory: each endpoint numbers the packets it sends on
//! a connection starting from one, and receivers only log them.

mod checksum;
mod command;
mod error;
pub mod frame;
mod packet;
mod sequence;

pub use checksum::{CHECKSUM_LEN, checksum, verify_checksum};
pub use command::{Command, ERROR_TAG, UnknownCommand, is_failure_tag};
pub use error::{DecodeError, EncodeError, FrameError};
pub use frame::{FRAME_HEADER_LEN, FrameDecoder, encode_frame, read_frame, write_frame};
pub use packet::{Body, Footer, Header, Packet, Role, decode, encode};
pub use sequence::SequenceCounter;

/// JSON object carried in a packet body's `data` field.
pub type Data = serde_json::Map<String, serde_json::Value>;
