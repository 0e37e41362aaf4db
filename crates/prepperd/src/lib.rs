//! Prepper protocol server.
//!
//! `prepperd` listens on a TCP endpoint configured through [`prepper_config`]
//! and serves the length-prefixed, checksummed request/response protocol
//! defined in [`prepper_protocol`]. Each accepted connection runs on its own
//! worker thread, up to `max_connections`; further connections are turned away
//! with an `ERROR` packet.
//!
//! Requests are routed by tag to a shared [`store::DataService`]. The bundled
//! [`store::MemoryStore`] keeps accounts, images, bookmarks and comments in
//! process memory and is seeded with sample content by [`run`].
//!
//! Lifecycle events flow through a [`HealthReporter`] and every request
//! produces a [`dispatch::DispatchEvent`] for the configured
//! [`dispatch::DispatchObserver`]; both default to structured `tracing`
//! output.

mod bootstrap;
pub mod dispatch;
mod health;
mod runtime;
pub mod store;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use runtime::{
    RuntimeError, Server, ServerHandle, ShutdownError, ShutdownSignal, SystemShutdownSignal, run,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
