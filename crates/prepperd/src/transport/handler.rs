//! Connection handling abstractions for the listener.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

const DRAIN_CHUNK_BYTES: usize = 4 * 1024;

/// Accepted client socket together with its peer address.
#[derive(Debug)]
pub(crate) struct Connection {
    stream: TcpStream,
    peer: Option<SocketAddr>,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        Self { stream, peer }
    }

    pub(crate) const fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Bounds how long a read may block. `None` waits indefinitely.
    pub(crate) fn set_idle_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    /// Bounds how long a write may block.
    pub(crate) fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_write_timeout(timeout)
    }

    /// Closes both directions, ignoring sockets the peer already closed.
    pub(crate) fn close(&self) {
        self.shutdown(Shutdown::Both);
    }

    /// Half-closes the socket and discards whatever the peer still sends,
    /// so queued replies are not lost to a reset. Draining stops after
    /// `grace` in total or once `limit` bytes were discarded.
    pub(crate) fn linger_close(mut self, grace: Duration, limit: usize) {
        self.shutdown(Shutdown::Write);
        let deadline = Instant::now() + grace;
        let mut remaining = limit;
        let mut scratch = [0_u8; DRAIN_CHUNK_BYTES];
        while remaining > 0 {
            let Some(wait) = deadline
                .checked_duration_since(Instant::now())
                .filter(|wait| !wait.is_zero())
            else {
                break;
            };
            if self.stream.set_read_timeout(Some(wait)).is_err() {
                break;
            }
            match self.stream.read(&mut scratch) {
                Ok(0) => break,
                Ok(read) => remaining = remaining.saturating_sub(read),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    tracing::trace!(
                        target: super::LISTENER_TARGET,
                        %error,
                        "stopped draining closed connection"
                    );
                    break;
                }
            }
        }
        self.close();
    }

    fn shutdown(&self, how: Shutdown) {
        if let Err(error) = self.stream.shutdown(how)
            && error.kind() != io::ErrorKind::NotConnected
        {
            tracing::debug!(
                target: super::LISTENER_TARGET,
                %error,
                "socket shutdown failed"
            );
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection until it closes. Implementations should
    /// avoid panicking.
    fn handle(&self, connection: Connection);
}
