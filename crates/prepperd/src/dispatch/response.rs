//! Responses produced by the command router.
//!
//! A [`Response`] is the body of the packet written back to the client
//! together with the [`Outcome`] reported to the dispatch observer. Framing and
//! sequence numbering happen in the connection handler.

use serde_json::Value;

use prepper_protocol::{Command, Data, ERROR_TAG};

use super::events::Outcome;

/// Response body chosen for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    command: String,
    data: Data,
    outcome: Outcome,
}

impl Response {
    /// Success reply carrying the command's success tag.
    pub fn succeeded(command: Command, data: Data) -> Self {
        Self {
            command: command.success_tag().to_owned(),
            data,
            outcome: Outcome::Succeeded,
        }
    }

    /// Refusal carrying the command's failure tag and a `message`.
    pub fn refused(command: Command, message: impl Into<String>) -> Self {
        Self {
            command: command.failure_tag().to_owned(),
            data: message_data(message),
            outcome: Outcome::Refused,
        }
    }

    /// `ERROR` reply for requests that never reached a command.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            command: ERROR_TAG.to_owned(),
            data: message_data(message),
            outcome: Outcome::Rejected,
        }
    }

    /// `ERROR` reply naming a tag the server does not know.
    pub fn unknown(tag: &str) -> Self {
        let mut response = Self::rejected("Unknown command");
        response
            .data
            .insert("command".to_owned(), Value::String(tag.to_owned()));
        response
    }

    /// Response tag.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Response arguments.
    pub const fn data(&self) -> &Data {
        &self.data
    }

    /// Resolution class for dispatch events.
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Splits the response into the tag and arguments to encode.
    pub fn into_parts(self) -> (String, Data) {
        (self.command, self.data)
    }
}

fn message_data(message: impl Into<String>) -> Data {
    let mut data = Data::new();
    data.insert("message".to_owned(), Value::String(message.into()));
    data
}
