//! Decoded server responses.

use serde_json::Value;

use prepper_protocol::{Data, Packet, is_failure_tag};

/// One response packet received from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    command: String,
    data: Data,
    sequence_number: u64,
}

impl Response {
    pub(crate) fn from_packet(packet: Packet) -> Self {
        let sequence_number = packet.sequence_number();
        let body = packet.into_body();
        Self {
            command: body.command,
            data: body.data,
            sequence_number,
        }
    }

    /// Response tag, for example `PONG` or `LOGIN_FAILED`.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Response body.
    #[must_use]
    pub const fn data(&self) -> &Data {
        &self.data
    }

    /// Sequence number the server stamped on the response.
    #[must_use]
    pub const fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// `false` for `ERROR` and every `*_FAILED` tag.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !is_failure_tag(&self.command)
    }

    /// The `message` field, present on every failure response.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }

    /// Consumes the response, returning its body.
    #[must_use]
    pub fn into_data(self) -> Data {
        self.data
    }
}
