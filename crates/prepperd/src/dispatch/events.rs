//! Structured per-request dispatch events.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use super::router::DISPATCH_TARGET;

/// How a request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    /// The command's success tag was returned.
    Succeeded,
    /// The command ran and answered with its failure tag.
    Refused,
    /// The request never reached a command: bad envelope, unknown tag or an
    /// internal fault. Answered with `ERROR`.
    Rejected,
}

/// One request/response exchange on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEvent {
    /// Remote address.
    pub peer: Option<SocketAddr>,
    /// Sequence number the client assigned, when the envelope was readable.
    pub sequence_number: Option<u64>,
    /// Request tag as received; empty when the envelope was unreadable.
    pub command: String,
    /// Tag of the response sent back.
    pub response_command: String,
    /// Session identity after the request was handled.
    pub identity: Option<String>,
    /// Resolution class.
    pub outcome: Outcome,
}

/// Receives a [`DispatchEvent`] for every request a connection handles.
pub trait DispatchObserver: Send + Sync {
    /// Called after the response has been chosen and before it is written.
    fn dispatched(&self, event: &DispatchEvent);
}

impl<T> DispatchObserver for Arc<T>
where
    T: DispatchObserver + ?Sized,
{
    fn dispatched(&self, event: &DispatchEvent) {
        (**self).dispatched(event);
    }
}

/// Default observer that records events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDispatchObserver;

impl TracingDispatchObserver {
    /// Builds a new observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DispatchObserver for TracingDispatchObserver {
    fn dispatched(&self, event: &DispatchEvent) {
        if event.outcome == Outcome::Rejected {
            warn!(
                target: DISPATCH_TARGET,
                peer = ?event.peer,
                sequence_number = ?event.sequence_number,
                command = %event.command,
                response = %event.response_command,
                identity = ?event.identity,
                outcome = %event.outcome,
                "request rejected"
            );
        } else {
            info!(
                target: DISPATCH_TARGET,
                peer = ?event.peer,
                sequence_number = ?event.sequence_number,
                command = %event.command,
                response = %event.response_command,
                identity = ?event.identity,
                outcome = %event.outcome,
                "request dispatched"
            );
        }
    }
}
