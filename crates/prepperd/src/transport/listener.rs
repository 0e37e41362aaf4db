//! Listener implementation for the server socket.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use prepper_config::{Config, ServerEndpoint};
use prepper_protocol::{Data, ERROR_TAG, Packet, Role, write_frame};

use super::{Connection, ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const REJECT_GRACE: Duration = Duration::from_millis(250);
const REJECT_DRAIN_BYTES: usize = 64 * 1024;
const MAX_REJECT_WORKERS: usize = 4;
const BUSY_MESSAGE: &str = "server busy";

/// Resource ceilings applied by the accept loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListenerLimits {
    pub(crate) max_connections: usize,
    pub(crate) max_frame_bytes: usize,
}

impl ListenerLimits {
    pub(crate) const fn from_config(config: &Config) -> Self {
        Self {
            max_connections: config.max_connections(),
            max_frame_bytes: config.max_frame_bytes(),
        }
    }
}

/// Listener bound to a TCP endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: ServerEndpoint,
    listener: TcpListener,
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &ServerEndpoint) -> Result<Self, ListenerError> {
        let listener = bind_tcp(endpoint.host(), endpoint.port())?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Address actually bound, which differs from the endpoint for port 0.
    pub(crate) fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        self.listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })
    }

    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        limits: ListenerLimits,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicUsize::new(0));
        let rejecting = Arc::new(AtomicUsize::new(0));
        let accept_loop = AcceptLoop {
            listener: self,
            shutdown: Arc::clone(&shutdown),
            active: Arc::clone(&active),
            rejecting: Arc::clone(&rejecting),
            handler,
            limits,
        };
        let handle = thread::Builder::new()
            .name("prepperd-accept".to_owned())
            .spawn(move || accept_loop.run())
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            active,
            rejecting,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    rejecting: Arc<AtomicUsize>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Connections currently being served by worker threads.
    pub(crate) fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Busy rejections still being delivered on rejection workers.
    pub(crate) fn rejecting_connections(&self) -> usize {
        self.rejecting.load(Ordering::SeqCst)
    }

    /// Waits for the accept loop to exit. The listening socket is closed when
    /// this returns; in-flight connections keep running on their workers.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Occupies one worker slot until dropped.
struct WorkerSlot {
    active: Arc<AtomicUsize>,
}

impl WorkerSlot {
    fn try_acquire(active: &Arc<AtomicUsize>, limit: usize) -> Option<Self> {
        active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < limit).then_some(current + 1)
            })
            .ok()
            .map(|_| Self {
                active: Arc::clone(active),
            })
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

struct AcceptLoop {
    listener: SocketListener,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    rejecting: Arc<AtomicUsize>,
    handler: Arc<dyn ConnectionHandler>,
    limits: ListenerLimits,
}

impl AcceptLoop {
    fn run(self) {
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.listener.endpoint,
            max_connections = self.limits.max_connections,
            "socket listener active"
        );
        let mut last_error = None::<io::ErrorKind>;
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.accept() {
                Ok(Some(connection)) => {
                    last_error = None;
                    self.dispatch(connection);
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(
                            target: LISTENER_TARGET,
                            error = %error,
                            "socket accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.listener.endpoint,
            "socket listener stopped"
        );
    }

    fn accept(&self) -> Result<Option<Connection>, io::Error> {
        match self.listener.listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(Connection::new(stream)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn dispatch(&self, connection: Connection) {
        let peer = connection.peer();
        let Some(slot) = WorkerSlot::try_acquire(&self.active, self.limits.max_connections) else {
            self.reject(connection);
            return;
        };
        debug!(
            target: LISTENER_TARGET,
            peer = ?peer,
            active = self.active.load(Ordering::SeqCst),
            "connection accepted"
        );
        let handler = Arc::clone(&self.handler);
        let spawned = thread::Builder::new()
            .name("prepperd-conn".to_owned())
            .spawn(move || {
                let _slot = slot;
                handler.handle(connection);
            });
        if let Err(error) = spawned {
            warn!(
                target: LISTENER_TARGET,
                peer = ?peer,
                %error,
                "failed to spawn connection worker"
            );
        }
    }

    /// Answers an over-limit connection with `ERROR "server busy"`.
    ///
    /// Rejections linger on a small pool of their own workers. When that pool
    /// is exhausted the refusal is written inline and the socket closed
    /// without draining.
    fn reject(&self, mut connection: Connection) {
        warn!(
            target: LISTENER_TARGET,
            peer = ?connection.peer(),
            limit = self.limits.max_connections,
            "rejecting connection: server busy"
        );
        let max_frame_bytes = self.limits.max_frame_bytes;
        let Some(slot) = WorkerSlot::try_acquire(&self.rejecting, MAX_REJECT_WORKERS) else {
            deliver_busy(&mut connection, max_frame_bytes);
            connection.close();
            return;
        };
        let spawned = thread::Builder::new()
            .name("prepperd-reject".to_owned())
            .spawn(move || {
                let _slot = slot;
                let mut connection = connection;
                deliver_busy(&mut connection, max_frame_bytes);
                connection.linger_close(REJECT_GRACE, REJECT_DRAIN_BYTES);
            });
        if let Err(error) = spawned {
            warn!(
                target: LISTENER_TARGET,
                %error,
                "failed to spawn rejection worker"
            );
        }
    }
}

fn deliver_busy(connection: &mut Connection, max_frame_bytes: usize) {
    if let Err(error) = write_busy(connection, max_frame_bytes) {
        debug!(
            target: LISTENER_TARGET,
            peer = ?connection.peer(),
            %error,
            "failed to deliver busy response"
        );
    }
}

fn write_busy(connection: &mut Connection, max_frame_bytes: usize) -> io::Result<()> {
    let mut data = Data::new();
    data.insert("message".to_owned(), BUSY_MESSAGE.into());
    let packet =
        Packet::new(ERROR_TAG, data, 1, Role::Server, Role::Client).map_err(io::Error::other)?;
    let bytes = packet.to_bytes().map_err(io::Error::other)?;
    connection.set_write_timeout(Some(REJECT_GRACE))?;
    write_frame(connection, &bytes, max_frame_bytes)?;
    Ok(())
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}
