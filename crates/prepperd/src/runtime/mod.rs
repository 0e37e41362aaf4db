//! Process runtime: bootstrap, serve until signalled, then stop.

mod server;
mod shutdown;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::store::{DataService, MemoryStore};
use crate::transport::ListenerError;

pub use self::server::{Server, ServerHandle};
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const RUNTIME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runtime");

/// Errors that stop the server process.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration or telemetry could not be set up.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The listener could not be bound, started or joined.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// Waiting for the shutdown signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Collaborators required to run the server.
pub(crate) struct RuntimePlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    pub(crate) store: Arc<dyn DataService>,
}

/// Runs the server with the production collaborators until a termination
/// signal arrives.
///
/// # Errors
///
/// Returns [`RuntimeError`] when bootstrap, binding or signal handling fails.
pub fn run() -> Result<(), RuntimeError> {
    run_with(RuntimePlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::new(),
        store: Arc::new(MemoryStore::with_sample_data()),
    })
}

/// Runs the server with injected collaborators.
pub(crate) fn run_with<L, S>(plan: RuntimePlan<L, S>) -> Result<(), RuntimeError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let RuntimePlan {
        loader,
        reporter,
        shutdown,
        store,
    } = plan;
    let daemon = bootstrap_with(&loader, Arc::clone(&reporter))?;
    let server = Server::bind(daemon.config(), store)?;
    let handle = server.start()?;
    let address = handle.local_addr();
    reporter.listener_ready(address);

    let waited = shutdown.wait();
    handle.stop();
    handle.join()?;
    reporter.listener_stopped(address);
    waited?;
    info!(
        target: RUNTIME_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
