//! Wiring of listener, handler and data service into a running server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use prepper_config::Config;

use crate::dispatch::{
    CommandRouter, DispatchConnectionHandler, DispatchObserver, TracingDispatchObserver,
};
use crate::store::DataService;
use crate::transport::{ListenerError, ListenerHandle, ListenerLimits, SocketListener};

/// A bound but not yet accepting server.
///
/// Binding and starting are separate so callers can learn the bound address
/// (port 0 picks a free port) before any connection is served.
pub struct Server {
    listener: SocketListener,
    local_addr: SocketAddr,
    limits: ListenerLimits,
    idle_timeout: Option<Duration>,
    store: Arc<dyn DataService>,
    observer: Arc<dyn DispatchObserver>,
}

impl Server {
    /// Binds the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the host does not resolve or the port
    /// cannot be bound.
    pub fn bind(config: &Config, store: Arc<dyn DataService>) -> Result<Self, ListenerError> {
        let listener = SocketListener::bind(&config.endpoint())?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            limits: ListenerLimits::from_config(config),
            idle_timeout: config.idle_timeout(),
            store,
            observer: Arc::new(TracingDispatchObserver::new()),
        })
    }

    /// Replaces the default tracing observer for dispatch events.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Address the listening socket is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the listener cannot be switched to
    /// non-blocking mode or its thread cannot be spawned.
    pub fn start(self) -> Result<ServerHandle, ListenerError> {
        let router = CommandRouter::new(self.store);
        let handler = Arc::new(DispatchConnectionHandler::new(
            router,
            self.observer,
            self.limits.max_frame_bytes,
            self.idle_timeout,
        ));
        let listener = self.listener.start(handler, self.limits)?;
        Ok(ServerHandle {
            local_addr: self.local_addr,
            listener,
        })
    }
}

/// Handle to a running server.
///
/// Dropping the handle asks the accept loop to stop without waiting for it.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    listener: ListenerHandle,
}

impl ServerHandle {
    /// Address clients should connect to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections currently being served.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.listener.active_connections()
    }

    /// Over-limit connections still receiving their busy refusal.
    #[must_use]
    pub fn rejecting_connections(&self) -> usize {
        self.listener.rejecting_connections()
    }

    /// Asks the accept loop to exit.
    pub fn stop(&self) {
        self.listener.shutdown();
    }

    /// Waits for the accept loop to exit. In-flight connections are left to
    /// finish on their own threads.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the accept loop panicked.
    pub fn join(self) -> Result<(), ListenerError> {
        self.listener.join()
    }
}
