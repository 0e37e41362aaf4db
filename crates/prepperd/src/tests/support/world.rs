//! Scenario world for the bootstrap and runtime behavioural suite.

use std::cell::RefCell;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use prepper_protocol::{Data, Role, decode, encode, read_frame, write_frame};

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::runtime::{RuntimeError, RuntimePlan, run_with};
use crate::store::MemoryStore;

use super::{FailingConfigLoader, ManualShutdownSignal, RecordingHealthReporter, TestConfigLoader};

const FRAME_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoaderChoice {
    Healthy,
    Failing,
}

struct RunningServer {
    stop: Sender<()>,
    thread: JoinHandle<Result<(), RuntimeError>>,
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: LoaderChoice,
    pub reporter: Arc<RecordingHealthReporter>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
    running: Option<RunningServer>,
    runtime_result: Option<Result<(), String>>,
    last_reply: Option<String>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    pub fn new() -> Self {
        Self {
            loader: LoaderChoice::Healthy,
            reporter: Arc::new(RecordingHealthReporter::default()),
            daemon: None,
            bootstrap_error: None,
            running: None,
            runtime_result: None,
            last_reply: None,
        }
    }

    pub fn use_failing_loader(&mut self) {
        self.loader = LoaderChoice::Failing;
    }

    pub fn use_successful_loader(&mut self) {
        self.loader = LoaderChoice::Healthy;
    }

    pub fn bootstrap(&mut self) {
        let loader: Box<dyn ConfigLoader> = match self.loader {
            LoaderChoice::Healthy => Box::new(TestConfigLoader),
            LoaderChoice::Failing => Box::new(FailingConfigLoader),
        };
        match bootstrap_with(loader.as_ref(), self.reporter.clone()) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Runs the full server runtime on a background thread.
    pub fn start_runtime(&mut self) {
        let (stop, shutdown) = ManualShutdownSignal::new();
        let reporter = self.reporter.clone();
        let choice = self.loader;
        let thread = thread::spawn(move || {
            let store = Arc::new(MemoryStore::with_sample_data());
            match choice {
                LoaderChoice::Healthy => run_with(RuntimePlan {
                    loader: TestConfigLoader,
                    reporter,
                    shutdown,
                    store,
                }),
                LoaderChoice::Failing => run_with(RuntimePlan {
                    loader: FailingConfigLoader,
                    reporter,
                    shutdown,
                    store,
                }),
            }
        });
        self.running = Some(RunningServer { stop, thread });
    }

    /// Polls the reporter until the listener announces its address.
    pub fn wait_until_ready(&self) -> Option<SocketAddr> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(address) = self.reporter.ready_address() {
                return Some(address);
            }
            if self
                .running
                .as_ref()
                .is_some_and(|running| running.thread.is_finished())
            {
                return None;
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }

    /// Sends one request to the running server and keeps the reply tag.
    pub fn send_request(&mut self, command: &str) {
        let address = self.wait_until_ready().expect("server never became ready");
        let mut stream = TcpStream::connect(address).expect("connect to server");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        let payload =
            encode(command, Data::new(), 1, Role::Client, Role::Server).expect("encode request");
        write_frame(&mut stream, &payload, FRAME_LIMIT).expect("send request");
        let frame = read_frame(&mut stream, FRAME_LIMIT).expect("read reply");
        let reply = decode(&frame).expect("decode reply");
        self.last_reply = Some(reply.command().to_owned());
    }

    /// Fires the shutdown signal and waits for the runtime to return.
    pub fn stop_runtime(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.stop.send(());
            self.runtime_result = Some(match running.thread.join() {
                Ok(result) => result.map_err(|error| error.to_string()),
                Err(_) => Err("runtime thread panicked".to_owned()),
            });
        }
    }

    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    pub fn daemon(&self) -> Option<&Daemon> {
        self.daemon.as_ref()
    }

    pub fn runtime_result(&self) -> Option<&Result<(), String>> {
        self.runtime_result.as_ref()
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.last_reply.as_deref()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        self.stop_runtime();
    }
}

pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
