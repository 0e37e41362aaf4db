//! Synchronous request/response client.

use std::net::TcpStream;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::{debug, warn};

use prepper_config::{Config, ServerEndpoint};
use prepper_protocol::{
    Command, Data, Role, SequenceCounter, decode, encode, read_frame, write_frame,
};

use crate::transport::connect;
use crate::{CLIENT_TARGET, ClientError, Response};

/// Connection parameters for a [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Server address.
    pub endpoint: ServerEndpoint,
    /// How long to wait for each response. Zero waits forever.
    pub request_timeout: Duration,
    /// Largest frame sent or accepted.
    pub max_frame_bytes: usize,
}

impl ClientSettings {
    /// Settings drawn from a resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.endpoint(),
            request_timeout: config.request_timeout(),
            max_frame_bytes: config.max_frame_bytes(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Which collection `SEARCH` looks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SearchKind {
    /// Images matched by caption, category or filename.
    #[default]
    Posts,
    /// Accounts matched by username.
    Users,
}

impl SearchKind {
    /// Value sent in the request's `type` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Users => "users",
        }
    }
}

/// An image to publish with [`Client::upload_image`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUpload {
    /// Uploading account.
    pub user_id: u64,
    /// File name stored with the image.
    pub filename: Option<String>,
    /// Externally hosted location, used instead of a file name.
    pub url: Option<String>,
    /// Free-text caption.
    pub caption: Option<String>,
    /// Category label.
    pub category: Option<String>,
    /// Raw image bytes, sent base64 encoded.
    pub bytes: Option<Vec<u8>>,
}

impl ImageUpload {
    fn into_data(self) -> Data {
        let mut data = Data::new();
        data.insert("user_id".to_owned(), self.user_id.into());
        let optional = [
            ("filename", self.filename),
            ("url", self.url),
            ("caption", self.caption),
            ("category", self.category),
            ("image", self.bytes.map(|bytes| STANDARD.encode(bytes))),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                data.insert(key.to_owned(), value.into());
            }
        }
        data
    }
}

/// Blocking client holding at most one connection.
///
/// Requests are strictly ping-pong: each call writes one frame and waits for
/// exactly one response frame. Any failure drops the socket and the next call
/// dials again.
#[derive(Debug)]
pub struct Client {
    settings: ClientSettings,
    stream: Option<TcpStream>,
    sequence: SequenceCounter,
}

impl Client {
    /// Creates a disconnected client.
    #[must_use]
    pub const fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            stream: None,
            sequence: SequenceCounter::new(),
        }
    }

    /// Settings the client was built with.
    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Returns `true` while a socket is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens the connection if none is open.
    ///
    /// Sequence numbers restart at one on every new connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Resolve`] or [`ClientError::Connect`] when the
    /// server cannot be reached.
    pub fn connect(&mut self) -> Result<(), ClientError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = connect(&self.settings.endpoint, self.settings.request_timeout)?;
        debug!(
            target: CLIENT_TARGET,
            endpoint = %self.settings.endpoint,
            "connected to server"
        );
        self.stream = Some(stream);
        self.sequence = SequenceCounter::new();
        Ok(())
    }

    /// Closes the connection, if any.
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!(
                target: CLIENT_TARGET,
                endpoint = %self.settings.endpoint,
                "disconnected from server"
            );
        }
    }

    /// Sends one request and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the server is unreachable, the exchange
    /// times out, the connection drops or the response fails validation. The
    /// connection is closed in every error case.
    pub fn send_request(&mut self, command: &str, data: Data) -> Result<Response, ClientError> {
        self.connect()?;
        let result = self.exchange(command, data);
        if let Err(error) = &result {
            warn!(
                target: CLIENT_TARGET,
                command,
                error = %error,
                "request failed; dropping connection"
            );
            self.disconnect();
        }
        result
    }

    fn exchange(&mut self, command: &str, data: Data) -> Result<Response, ClientError> {
        let sequence_number = self.sequence.next();
        let payload = encode(command, data, sequence_number, Role::Client, Role::Server)?;
        let limit = self.settings.max_frame_bytes;
        let timeout = self.settings.request_timeout;
        let stream = self.stream.as_mut().ok_or(ClientError::Closed)?;

        write_frame(stream, &payload, limit)
            .map_err(|error| ClientError::from_frame(error, timeout))?;
        let frame =
            read_frame(stream, limit).map_err(|error| ClientError::from_frame(error, timeout))?;
        let response = Response::from_packet(decode(&frame)?);
        debug!(
            target: CLIENT_TARGET,
            command,
            sequence_number,
            response = response.command(),
            "request answered"
        );
        Ok(response)
    }

    /// Presentation-layer call: `(true, body)` on success, `(false, message)`
    /// when the server refused the request or the exchange failed.
    pub fn send(&mut self, command: &str, data: Data) -> (bool, Value) {
        match self.send_request(command, data) {
            Ok(response) if response.is_success() => (true, Value::Object(response.into_data())),
            Ok(response) => {
                let message = response
                    .message()
                    .map_or_else(|| response.command().to_owned(), str::to_owned);
                (false, Value::String(message))
            }
            Err(error) => (false, Value::String(error.to_string())),
        }
    }

    fn call(&mut self, command: Command, data: Value) -> Result<Response, ClientError> {
        let data = match data {
            Value::Object(map) => map,
            _ => Data::new(),
        };
        self.send_request(command.as_str(), data)
    }

    /// `PING` stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn ping(&mut self) -> Result<Response, ClientError> {
        self.ping_at(epoch_seconds())
    }

    /// `PING` carrying an explicit timestamp, echoed back as
    /// `received_timestamp`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn ping_at(&mut self, timestamp: f64) -> Result<Response, ClientError> {
        self.call(Command::Ping, json!({ "timestamp": timestamp }))
    }

    /// `ECHO` with a free-form message.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn echo(&mut self, message: &str) -> Result<Response, ClientError> {
        self.call(Command::Echo, json!({ "message": message }))
    }

    /// `LOGIN`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn login(&mut self, username: &str, password: &str) -> Result<Response, ClientError> {
        self.call(
            Command::Login,
            json!({ "username": username, "password": password }),
        )
    }

    /// `REGISTER`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn register(
        &mut self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<Response, ClientError> {
        self.call(
            Command::Register,
            json!({ "username": username, "password": password, "email": email }),
        )
    }

    /// `LOGOUT`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn logout(&mut self) -> Result<Response, ClientError> {
        self.call(Command::Logout, json!({}))
    }

    /// `UPLOAD_IMAGE`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn upload_image(&mut self, upload: ImageUpload) -> Result<Response, ClientError> {
        self.send_request(Command::UploadImage.as_str(), upload.into_data())
    }

    /// `GET_IMAGES`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn get_images(&mut self) -> Result<Response, ClientError> {
        self.call(Command::GetImages, json!({}))
    }

    /// `GET_SAVED_IMAGES` for one account.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn get_saved_images(&mut self, user_id: u64) -> Result<Response, ClientError> {
        self.call(Command::GetSavedImages, json!({ "user_id": user_id }))
    }

    /// `SAVE_IMAGE`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn save_image(&mut self, user_id: u64, image_id: u64) -> Result<Response, ClientError> {
        self.call(
            Command::SaveImage,
            json!({ "user_id": user_id, "image_id": image_id }),
        )
    }

    /// `UNSAVE_IMAGE`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn unsave_image(&mut self, user_id: u64, image_id: u64) -> Result<Response, ClientError> {
        self.call(
            Command::UnsaveImage,
            json!({ "user_id": user_id, "image_id": image_id }),
        )
    }

    /// `ADD_COMMENT`, anonymous when `user_id` is `None`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn add_comment(
        &mut self,
        image_id: u64,
        text: &str,
        user_id: Option<u64>,
    ) -> Result<Response, ClientError> {
        self.call(
            Command::AddComment,
            json!({ "image_id": image_id, "text": text, "user_id": user_id }),
        )
    }

    /// `GET_COMMENTS`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn get_comments(&mut self, image_id: u64) -> Result<Response, ClientError> {
        self.call(Command::GetComments, json!({ "image_id": image_id }))
    }

    /// `GET_USER`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn get_user(&mut self, user_id: u64) -> Result<Response, ClientError> {
        self.call(Command::GetUser, json!({ "user_id": user_id }))
    }

    /// `SEARCH`. Post results carry `is_saved` when `user_id` is given.
    ///
    /// # Errors
    ///
    /// See [`Client::send_request`].
    pub fn search(
        &mut self,
        kind: SearchKind,
        query: &str,
        user_id: Option<u64>,
    ) -> Result<Response, ClientError> {
        self.call(
            Command::Search,
            json!({ "type": kind.as_str(), "query": query, "user_id": user_id }),
        )
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}
