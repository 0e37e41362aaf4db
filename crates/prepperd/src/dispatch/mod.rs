//! Request dispatch for the Prepper wire protocol.
//!
//! This module turns decoded packets into responses. The connection handler
//! owns the read loop for one socket: it reassembles length-prefixed frames,
//! validates each envelope, routes the request through the
//! [`CommandRouter`] and writes exactly one response frame back.
//!
//! ## Protocol
//!
//! A request body names a command and carries its arguments:
//!
//! ```json
//! {"command":"SAVE_IMAGE","data":{"user_id":1,"image_id":9}}
//! ```
//!
//! The server answers with the command's success tag, its failure tag, or
//! `ERROR` when the request never reached a command:
//!
//! ```json
//! {"command":"SAVE_IMAGE_SUCCESS","data":{"user_id":1,"image_id":9}}
//! {"command":"SAVE_IMAGE_FAILED","data":{"message":"Image already saved by this user"}}
//! {"command":"ERROR","data":{"message":"Unknown command","command":"FLY"}}
//! ```
//!
//! Every exchange is reported to a [`DispatchObserver`] as a
//! [`DispatchEvent`].

mod errors;
mod events;
mod handler;
mod request;
mod response;
mod router;
mod session;

pub use self::errors::ConnectionError;
pub use self::events::{DispatchEvent, DispatchObserver, Outcome, TracingDispatchObserver};
pub(crate) use self::handler::DispatchConnectionHandler;
pub use self::response::Response;
pub use self::router::CommandRouter;
pub use self::session::Session;
