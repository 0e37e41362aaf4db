//! Per-connection state carried between requests.

use std::net::SocketAddr;

use prepper_protocol::SequenceCounter;

/// State of one client connection.
///
/// The identity label is set by a successful `LOGIN` and cleared by `LOGOUT`.
/// It only annotates logs and dispatch events; it never authorizes anything.
#[derive(Debug, Default)]
pub struct Session {
    peer: Option<SocketAddr>,
    identity: Option<String>,
    outbound: SequenceCounter,
    last_inbound: Option<u64>,
}

impl Session {
    /// Creates the session for a freshly accepted connection.
    #[must_use]
    pub fn new(peer: Option<SocketAddr>) -> Self {
        Self {
            peer,
            ..Self::default()
        }
    }

    /// Remote address, when the socket reported one.
    #[must_use]
    pub const fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Username attached by the last successful login.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub(crate) fn set_identity(&mut self, username: impl Into<String>) {
        self.identity = Some(username.into());
    }

    pub(crate) fn clear_identity(&mut self) -> Option<String> {
        self.identity.take()
    }

    /// Sequence number for the next response on this connection.
    pub(crate) const fn next_sequence(&mut self) -> u64 {
        self.outbound.next()
    }

    pub(crate) const fn record_inbound(&mut self, sequence_number: u64) {
        self.last_inbound = Some(sequence_number);
    }

    /// Sequence number of the most recent valid request.
    #[must_use]
    pub const fn last_inbound(&self) -> Option<u64> {
        self.last_inbound
    }
}
