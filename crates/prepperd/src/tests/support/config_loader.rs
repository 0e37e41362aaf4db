//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::OrthoError;

use prepper_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader that binds loopback on an ephemeral port.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestConfigLoader;

impl TestConfigLoader {
    /// Configuration every successful scenario runs with.
    #[must_use]
    pub fn config() -> Config {
        Config {
            host: "127.0.0.1".to_owned(),
            port: 0,
            max_connections: 4,
            idle_timeout_secs: 5,
            ..Config::default()
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Self::config())
    }
}

/// Loader that intentionally fails by passing an out-of-range port flag.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("prepperd"),
            OsString::from("--port"),
            OsString::from("70000"),
        ];
        Config::load_from_iter(args)
    }
}
