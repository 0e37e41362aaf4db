//! TCP listener for the Prepper server.
//!
//! The transport module binds the configured endpoint, accepts connections on
//! a background thread and hands each one to a [`ConnectionHandler`] running
//! on its own worker thread, up to a fixed number of concurrent workers.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{Connection, ConnectionHandler};
pub(crate) use self::listener::{ListenerHandle, ListenerLimits, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{BlockingHandler, CountingHandler};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
