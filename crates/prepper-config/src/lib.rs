//! Shared configuration for the Prepper server and client.
//!
//! Both binaries resolve a single [`Config`] through `ortho_config`, layering
//! built-in defaults, an optional TOML file (`--config-path`), `PREPPER_*`
//! environment variables and command-line flags, in that order of precedence.

mod defaults;
mod endpoint;
mod logging;

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoResult};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HOST, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LOG_FILTER, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MAX_FRAME_BYTES, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS, default_endpoint,
    default_log_filter, default_log_format,
};
pub use endpoint::ServerEndpoint;
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration shared by `prepperd` and `prepper`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PREPPER")]
#[serde(default)]
pub struct Config {
    /// Host name or address the server binds to and the client dials.
    #[ortho_config(default = DEFAULT_HOST.to_owned())]
    pub host: String,
    /// TCP port of the server.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Ceiling on concurrently served connections.
    #[ortho_config(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,
    /// Largest frame, in bytes, either side accepts.
    #[ortho_config(default = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: usize,
    /// Seconds an idle server connection is kept open. Zero disables the limit.
    #[ortho_config(default = DEFAULT_IDLE_TIMEOUT_SECS)]
    pub idle_timeout_secs: u64,
    /// Seconds the client waits for each response.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,
    /// `tracing` filter expression.
    #[ortho_config(default = DEFAULT_LOG_FILTER.to_owned())]
    pub log_filter: String,
    /// Output format for log records.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments, environment and
    /// configuration file.
    ///
    /// # Errors
    ///
    /// Returns the `ortho_config` error when a layer cannot be read or the
    /// merged values do not deserialize.
    pub fn load() -> OrthoResult<Self> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration using `args` in place of the process arguments.
    ///
    /// # Errors
    ///
    /// Returns the `ortho_config` error when a layer cannot be read or the
    /// merged values do not deserialize.
    pub fn load_from_iter<I, T>(args: I) -> OrthoResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Endpoint built from the configured host and port.
    #[must_use]
    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.host.clone(), self.port)
    }

    /// Maximum number of concurrent connection workers.
    #[must_use]
    pub const fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Maximum accepted frame length.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    /// Idle timeout applied to server connections, if enabled.
    #[must_use]
    pub const fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_secs))
        }
    }

    /// Per-request response timeout used by the client.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
