//! Connection handler that frames, validates and dispatches packets.
//!
//! Each connection runs a read loop: bytes are fed into a [`FrameDecoder`],
//! every complete frame is decoded and routed, and exactly one response frame
//! is written per request, in order. Integrity failures are answered with
//! `ERROR` and the connection stays open. An oversized frame is answered with
//! `ERROR` and ends the connection.

use std::any::Any;
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use prepper_protocol::{
    Data, ERROR_TAG, FrameDecoder, FrameError, Packet, Role, decode, write_frame,
};

use crate::transport::{Connection, ConnectionHandler};

use super::errors::ConnectionError;
use super::events::{DispatchEvent, DispatchObserver};
use super::response::Response;
use super::router::{CommandRouter, DISPATCH_TARGET};
use super::session::Session;

const READ_CHUNK_BYTES: usize = 8 * 1024;
const CLOSE_GRACE: Duration = Duration::from_millis(250);
const INTERNAL_ERROR: &str = "Internal server error";
const RESPONSE_TOO_LARGE: &str = "Response exceeds the maximum frame size";

/// Serves the request/response protocol on accepted connections.
pub(crate) struct DispatchConnectionHandler {
    router: CommandRouter,
    observer: Arc<dyn DispatchObserver>,
    max_frame_bytes: usize,
    idle_timeout: Option<Duration>,
}

impl DispatchConnectionHandler {
    /// Creates a handler. An `idle_timeout` of `None` lets connections idle
    /// forever.
    pub(crate) fn new(
        router: CommandRouter,
        observer: Arc<dyn DispatchObserver>,
        max_frame_bytes: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            router,
            observer,
            max_frame_bytes,
            idle_timeout,
        }
    }

    fn serve(
        &self,
        connection: &mut Connection,
        session: &mut Session,
    ) -> Result<(), ConnectionError> {
        let mut decoder = FrameDecoder::new(self.max_frame_bytes);
        let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
        loop {
            let read = self.read_with_retry(connection, &mut chunk)?;
            let Some(bytes) = chunk.get(..read).filter(|bytes| !bytes.is_empty()) else {
                if decoder.buffered() > 0 {
                    debug!(
                        target: DISPATCH_TARGET,
                        peer = ?session.peer(),
                        buffered = decoder.buffered(),
                        "peer closed mid-frame"
                    );
                }
                return Ok(());
            };
            decoder.extend(bytes);
            while let Some(frame) = decoder.next_frame()? {
                self.exchange(connection, session, &frame)?;
            }
        }
    }

    /// Reads from the socket, retrying on interrupts.
    fn read_with_retry(
        &self,
        connection: &mut Connection,
        buf: &mut [u8],
    ) -> Result<usize, ConnectionError> {
        loop {
            match connection.read(buf) {
                Ok(read) => return Ok(read),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(match self.idle_timeout {
                        Some(after) => ConnectionError::IdleTimeout { after },
                        None => error.into(),
                    });
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Handles one frame and writes its response.
    fn exchange(
        &self,
        connection: &mut Connection,
        session: &mut Session,
        frame: &[u8],
    ) -> Result<(), ConnectionError> {
        let (request, response) = match decode(frame) {
            Ok(packet) => {
                session.record_inbound(packet.sequence_number());
                let response = self.route_guarded(packet.command(), packet.data(), session);
                (Some(packet), response)
            }
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    peer = ?session.peer(),
                    %error,
                    "rejecting invalid packet"
                );
                (None, Response::rejected(error.to_string()))
            }
        };
        self.observer.dispatched(&DispatchEvent {
            peer: session.peer(),
            sequence_number: request.as_ref().map(Packet::sequence_number),
            command: request
                .as_ref()
                .map(|packet| packet.command().to_owned())
                .unwrap_or_default(),
            response_command: response.command().to_owned(),
            identity: session.identity().map(str::to_owned),
            outcome: response.outcome(),
        });
        self.respond(connection, session, response)
    }

    fn route_guarded(&self, tag: &str, data: &Data, session: &mut Session) -> Response {
        let routed =
            panic::catch_unwind(AssertUnwindSafe(|| self.router.route(tag, data, session)));
        routed.unwrap_or_else(|payload| {
            error!(
                target: DISPATCH_TARGET,
                peer = ?session.peer(),
                command = tag,
                panic = panic_message(payload.as_ref()),
                "command handler panicked"
            );
            Response::rejected(INTERNAL_ERROR)
        })
    }

    fn respond(
        &self,
        connection: &mut Connection,
        session: &mut Session,
        response: Response,
    ) -> Result<(), ConnectionError> {
        let sequence_number = session.next_sequence();
        let (command, data) = response.into_parts();
        let mut bytes = Packet::new(command, data, sequence_number, Role::Server, Role::Client)?
            .to_bytes()?;
        if bytes.len() > self.max_frame_bytes {
            warn!(
                target: DISPATCH_TARGET,
                peer = ?session.peer(),
                length = bytes.len(),
                limit = self.max_frame_bytes,
                "response too large for one frame"
            );
            let (command, data) = Response::rejected(RESPONSE_TOO_LARGE).into_parts();
            bytes = Packet::new(command, data, sequence_number, Role::Server, Role::Client)?
                .to_bytes()?;
        }
        write_frame(connection, &bytes, self.max_frame_bytes)?;
        Ok(())
    }

    /// Tells the peer its frame was refused before the connection is dropped.
    fn refuse_frame(
        &self,
        connection: &mut Connection,
        session: &mut Session,
        reason: &FrameError,
    ) {
        let response = Response::rejected(reason.to_string());
        self.observer.dispatched(&DispatchEvent {
            peer: session.peer(),
            sequence_number: None,
            command: String::new(),
            response_command: ERROR_TAG.to_owned(),
            identity: session.identity().map(str::to_owned),
            outcome: response.outcome(),
        });
        if let Err(error) = self.respond(connection, session, response) {
            debug!(
                target: DISPATCH_TARGET,
                peer = ?session.peer(),
                %error,
                "failed to deliver frame refusal"
            );
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, mut connection: Connection) {
        let mut session = Session::new(connection.peer());
        if let Err(error) = connection.set_idle_timeout(self.idle_timeout) {
            warn!(
                target: DISPATCH_TARGET,
                peer = ?session.peer(),
                %error,
                "failed to apply idle timeout"
            );
        }
        debug!(target: DISPATCH_TARGET, peer = ?session.peer(), "serving connection");
        match self.serve(&mut connection, &mut session) {
            Ok(()) => {
                debug!(
                    target: DISPATCH_TARGET,
                    peer = ?session.peer(),
                    last_sequence = ?session.last_inbound(),
                    "client disconnected"
                );
                connection.close();
            }
            Err(ConnectionError::Frame(reason @ FrameError::TooLarge { .. })) => {
                warn!(
                    target: DISPATCH_TARGET,
                    peer = ?session.peer(),
                    error = %reason,
                    "closing connection after oversized frame"
                );
                self.refuse_frame(&mut connection, &mut session, &reason);
                connection.linger_close(
                    CLOSE_GRACE,
                    self.max_frame_bytes.saturating_add(READ_CHUNK_BYTES),
                );
            }
            Err(error) => {
                debug!(
                    target: DISPATCH_TARGET,
                    peer = ?session.peer(),
                    %error,
                    "connection closed"
                );
                connection.close();
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
