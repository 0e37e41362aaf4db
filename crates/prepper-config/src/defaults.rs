use crate::endpoint::ServerEndpoint;

/// Default bind/dial host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5001;

/// Default ceiling on concurrently served connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Default frame ceiling. Image uploads travel base64-encoded inside a single
/// frame, so the limit leaves room for a few megabytes of image data.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Default idle timeout for server connections, in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default client response timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Endpoint used when neither file, environment nor flags override it.
#[must_use]
pub fn default_endpoint() -> ServerEndpoint {
    ServerEndpoint::new(DEFAULT_HOST, DEFAULT_PORT)
}
