//! Shared harness for end-to-end tests against an in-process server.

use std::sync::Arc;
use std::time::Duration;

use prepper_client::{Client, ClientSettings};
use prepper_config::{Config, ServerEndpoint};
use prepperd::store::MemoryStore;
use prepperd::{Server, ServerHandle};

pub const FRAME_LIMIT: usize = 1024 * 1024;

/// A running server that stops when dropped.
pub struct RunningServer {
    handle: Option<ServerHandle>,
    port: u16,
}

impl RunningServer {
    pub fn start() -> Self {
        Self::with_config(Config {
            host: "127.0.0.1".to_owned(),
            port: 0,
            max_connections: 8,
            idle_timeout_secs: 5,
            ..Config::default()
        })
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::with_sample_data());
        let handle = Server::bind(&config, store)
            .expect("bind server")
            .start()
            .expect("start server");
        let port = handle.local_addr().port();
        Self {
            handle: Some(handle),
            port,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn settings(&self) -> ClientSettings {
        ClientSettings {
            endpoint: ServerEndpoint::new("127.0.0.1", self.port),
            request_timeout: Duration::from_secs(5),
            max_frame_bytes: FRAME_LIMIT,
        }
    }

    pub fn client(&self) -> Client {
        Client::new(self.settings())
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
            let _ = handle.join();
        }
    }
}
