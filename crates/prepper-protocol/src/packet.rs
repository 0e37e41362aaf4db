//! Envelope types and the pure encode/decode pair.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::Data;
use crate::checksum::{checksum, verify_checksum};
use crate::error::{DecodeError, EncodeError};

/// Endpoint role named in a packet header.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Role {
    /// Requesting side.
    Client,
    /// Responding side.
    Server,
}

/// Routing and bookkeeping metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Sender role.
    pub source: Role,
    /// Receiver role.
    pub destination: Role,
    /// Byte length of the serialized body at creation time.
    #[serde(default)]
    pub size: usize,
    /// Per-connection, per-direction counter assigned by the sender.
    #[serde(default)]
    pub sequence_number: u64,
}

/// Command tag plus its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Request or response tag.
    pub command: String,
    /// Command arguments or results.
    #[serde(default)]
    pub data: Data,
}

/// Integrity trailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    /// Hex MD5 digest of the serialized body.
    pub checksum: String,
}

/// A validated envelope together with the exact body bytes it carried.
#[derive(Debug, Clone)]
pub struct Packet {
    header: Header,
    body: Body,
    footer: Footer,
    raw_body: Box<RawValue>,
}

#[derive(Serialize)]
struct OutboundEnvelope<'a> {
    header: &'a Header,
    body: &'a RawValue,
    footer: &'a Footer,
}

#[derive(Deserialize)]
struct InboundEnvelope<'a> {
    #[serde(default)]
    header: Option<Header>,
    #[serde(borrow, default)]
    body: Option<&'a RawValue>,
    #[serde(default)]
    footer: Option<InboundFooter>,
}

#[derive(Deserialize)]
struct InboundFooter {
    #[serde(default)]
    checksum: Option<String>,
}

impl Packet {
    /// Builds a packet, serializing the body and stamping its size and
    /// checksum.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the body cannot be serialized.
    pub fn new(
        command: impl Into<String>,
        data: Data,
        sequence_number: u64,
        source: Role,
        destination: Role,
    ) -> Result<Self, EncodeError> {
        let body = Body {
            command: command.into(),
            data,
        };
        let raw_body = serde_json::value::to_raw_value(&body)?;
        let bytes = raw_body.get().as_bytes();
        Ok(Self {
            header: Header {
                source,
                destination,
                size: bytes.len(),
                sequence_number,
            },
            footer: Footer {
                checksum: checksum(bytes),
            },
            body,
            raw_body,
        })
    }

    /// Envelope header.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Parsed body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Envelope footer.
    #[must_use]
    pub const fn footer(&self) -> &Footer {
        &self.footer
    }

    /// Command tag carried in the body.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.body.command
    }

    /// Body arguments.
    #[must_use]
    pub const fn data(&self) -> &Data {
        &self.body.data
    }

    /// Sender-assigned sequence number.
    #[must_use]
    pub const fn sequence_number(&self) -> u64 {
        self.header.sequence_number
    }

    /// Exact body bytes covered by the checksum.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        self.raw_body.get().as_bytes()
    }

    /// Consumes the packet, returning its body.
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Serializes the envelope, embedding the body bytes verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let envelope = OutboundEnvelope {
            header: &self.header,
            body: &self.raw_body,
            footer: &self.footer,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.footer == other.footer
            && self.body_bytes() == other.body_bytes()
    }
}

/// Serializes a complete envelope ready for framing.
///
/// # Errors
///
/// Returns [`EncodeError`] when serialization fails.
pub fn encode(
    command: &str,
    data: Data,
    sequence_number: u64,
    source: Role,
    destination: Role,
) -> Result<Vec<u8>, EncodeError> {
    Packet::new(command, data, sequence_number, source, destination)?.to_bytes()
}

/// Parses and validates an envelope.
///
/// Checks run in a fixed order: envelope shape, header presence, checksum
/// presence, checksum match, then body shape. The digest is computed over
/// the body bytes as received.
///
/// # Errors
///
/// Returns [`DecodeError`] describing the first failed check.
pub fn decode(bytes: &[u8]) -> Result<Packet, DecodeError> {
    let envelope: InboundEnvelope<'_> =
        serde_json::from_slice(bytes).map_err(|error| DecodeError::malformed(&error))?;
    let header = envelope.header.ok_or(DecodeError::MissingHeader)?;
    let expected = envelope
        .footer
        .and_then(|footer| footer.checksum)
        .ok_or(DecodeError::MissingChecksum)?;
    let raw = envelope
        .body
        .ok_or_else(|| DecodeError::MalformedEnvelope("missing body".to_owned()))?;

    let body_bytes = raw.get().as_bytes();
    if !verify_checksum(body_bytes, &expected) {
        return Err(DecodeError::ChecksumMismatch {
            expected,
            actual: checksum(body_bytes),
        });
    }

    let body: Body =
        serde_json::from_str(raw.get()).map_err(|error| DecodeError::malformed(&error))?;
    Ok(Packet {
        header,
        body,
        footer: Footer { checksum: expected },
        raw_body: raw.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;

    fn data(value: Value) -> Data {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn round_trip_preserves_command_and_data() {
        let bytes = encode(
            "LOGIN",
            data(json!({"username": "test_user", "password": "test_pass"})),
            1,
            Role::Client,
            Role::Server,
        )
        .expect("encode");

        let packet = decode(&bytes).expect("decode");
        assert_eq!(packet.command(), "LOGIN");
        assert_eq!(packet.data().get("username"), Some(&json!("test_user")));
        assert_eq!(packet.header().source, Role::Client);
        assert_eq!(packet.header().destination, Role::Server);
        assert_eq!(packet.sequence_number(), 1);
    }

    fn envelope_with_body(body: &str) -> String {
        let header = r#"{"source":"CLIENT","destination":"SERVER"}"#;
        let digest = checksum(body.as_bytes());
        format!(r#"{{"header":{header},"body":{body},"footer":{{"checksum":"{digest}"}}}}"#)
    }

    #[test]
    fn footer_checksum_covers_body_bytes() {
        let arguments = data(json!({"timestamp": 1000.0}));
        let packet =
            Packet::new("PING", arguments, 3, Role::Client, Role::Server).expect("packet");
        assert_eq!(packet.footer().checksum, checksum(packet.body_bytes()));
        assert_eq!(packet.header().size, packet.body_bytes().len());

        let decoded = decode(&packet.to_bytes().expect("bytes")).expect("decode");
        assert_eq!(decoded, packet);
    }

    #[test]
    fn digest_uses_received_bytes_rather_than_reserialized_body() {
        let body = r#"{ "data" : {"b": 2, "a": 1}, "command": "ECHO" }"#;
        let envelope = envelope_with_body(body);

        let packet = decode(envelope.as_bytes()).expect("decode");
        assert_eq!(packet.body_bytes(), body.as_bytes());
        assert_eq!(packet.command(), "ECHO");
        assert_eq!(packet.sequence_number(), 0);
    }

    #[test]
    fn corrupting_a_body_byte_fails_validation() {
        let arguments = data(json!({"user_id": 1, "image_id": 9}));
        let bytes =
            encode("SAVE_IMAGE", arguments, 1, Role::Client, Role::Server).expect("encode");
        let text = String::from_utf8(bytes).expect("utf8");
        let corrupted = text.replacen("\"image_id\":9", "\"image_id\":8", 1);
        assert_ne!(text, corrupted);

        let error = decode(corrupted.as_bytes()).expect_err("corruption must be detected");
        assert!(matches!(error, DecodeError::ChecksumMismatch { .. }));
    }

    #[rstest]
    #[case::missing_header(
        r#"{"body":{"command":"PING","data":{}},"footer":{"checksum":"00"}}"#,
        DecodeError::MissingHeader
    )]
    #[case::missing_footer(
        r#"{"header":{"source":"CLIENT","destination":"SERVER"},"body":{"command":"PING","data":{}}}"#,
        DecodeError::MissingChecksum
    )]
    #[case::missing_checksum_field(
        r#"{"header":{"source":"CLIENT","destination":"SERVER"},"body":{"command":"PING","data":{}},"footer":{}}"#,
        DecodeError::MissingChecksum
    )]
    fn structural_checks_report_the_missing_section(
        #[case] input: &str,
        #[case] expected: DecodeError,
    ) {
        assert_eq!(decode(input.as_bytes()), Err(expected));
    }

    #[rstest]
    #[case::not_json("this is not json")]
    #[case::truncated(r#"{"header":{"source":"CLIENT""#)]
    #[case::array("[1,2,3]")]
    #[case::missing_body(
        r#"{"header":{"source":"CLIENT","destination":"SERVER"},"footer":{"checksum":"00"}}"#
    )]
    fn malformed_envelopes_are_rejected(#[case] input: &str) {
        let error = decode(input.as_bytes()).expect_err("malformed input");
        assert!(matches!(error, DecodeError::MalformedEnvelope(_)), "got {error:?}");
    }

    #[test]
    fn body_without_command_is_malformed_even_with_valid_checksum() {
        let body = r#"{"data":{}}"#;
        let envelope = envelope_with_body(body);
        let error = decode(envelope.as_bytes()).expect_err("command is required");
        assert!(matches!(error, DecodeError::MalformedEnvelope(_)));
    }

    #[test]
    fn roles_display_in_upper_case() {
        assert_eq!(Role::Client.to_string(), "CLIENT");
        assert_eq!(Role::Server.to_string(), "SERVER");
    }
}
