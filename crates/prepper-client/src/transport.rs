//! Socket helpers for dialling the server.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use prepper_config::ServerEndpoint;

use crate::ClientError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens one TCP connection to `endpoint` with read and write timeouts
/// applied.
pub(crate) fn connect(
    endpoint: &ServerEndpoint,
    request_timeout: Duration,
) -> Result<TcpStream, ClientError> {
    let display = endpoint.to_string();
    let address =
        resolve_tcp_address(endpoint.host(), endpoint.port()).map_err(|source| {
            ClientError::Resolve {
                endpoint: display.clone(),
                source,
            }
        })?;

    let stream = TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT).map_err(|source| {
        ClientError::Connect {
            endpoint: display,
            source,
        }
    })?;
    let timeout = socket_timeout(request_timeout);
    stream.set_read_timeout(timeout).map_err(ClientError::Io)?;
    stream.set_write_timeout(timeout).map_err(ClientError::Io)?;
    stream.set_nodelay(true).map_err(ClientError::Io)?;
    Ok(stream)
}

/// Zero disables the timeout; the socket API rejects a zero duration.
const fn socket_timeout(timeout: Duration) -> Option<Duration> {
    if timeout.is_zero() {
        None
    } else {
        Some(timeout)
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}
