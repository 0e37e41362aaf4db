//! Test harness utilities for the server behavioural suites.

mod config_loader;
mod observer;
mod reporter;
mod shutdown;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use observer::RecordingDispatchObserver;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::ManualShutdownSignal;
pub use world::{TestWorld, world};
