//! Command routing for decoded requests.
//!
//! The router maps a request tag onto a [`Command`], extracts the command's
//! arguments and calls the shared [`DataService`]. It never fails outward:
//! collaborator refusals and bad arguments become `<COMMAND>_FAILED` replies
//! and unknown tags become `ERROR`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use prepper_protocol::{Command, Data};

use crate::store::{DataService, NewComment, NewImage, NewUser, StoreError};

use super::request::{FieldError, Fields};
use super::response::Response;
use super::session::Session;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

const ECHO_MESSAGE: &str = "Server received your request";
const LOGOUT_MESSAGE: &str = "Logged out successfully";

/// Reasons a known command answers with its failure tag.
#[derive(Debug, Error)]
enum Refusal {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Invalid(String),
    #[error("Failed to encode response: {0}")]
    Serialize(#[from] serde_json::Error),
}

type Handled = Result<Data, Refusal>;

/// What a `SEARCH` request looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum SearchKind {
    Posts,
    Users,
}

/// Routes decoded requests to the data service.
#[derive(Clone)]
pub struct CommandRouter {
    store: Arc<dyn DataService>,
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("CommandRouter").finish_non_exhaustive()
    }
}

impl CommandRouter {
    /// Creates a router backed by `store`.
    pub fn new(store: Arc<dyn DataService>) -> Self {
        Self { store }
    }

    /// Executes one request and returns the response to send back.
    pub fn route(&self, tag: &str, data: &Data, session: &mut Session) -> Response {
        let Some(command) = Command::parse(tag) else {
            debug!(target: DISPATCH_TARGET, command = tag, "unknown command");
            return Response::unknown(tag.trim());
        };
        debug!(
            target: DISPATCH_TARGET,
            command = command.as_str(),
            identity = session.identity(),
            "routing command"
        );
        let fields = Fields::new(data);
        let handled = match command {
            Command::Ping => Ok(ping(fields)),
            Command::Login => self.login(fields, session),
            Command::Register => self.register(fields),
            Command::Logout => Ok(logout(session)),
            Command::UploadImage => self.upload_image(fields),
            Command::GetImages => self.get_images(),
            Command::GetSavedImages => self.get_saved_images(fields),
            Command::SaveImage => self.save_image(fields),
            Command::UnsaveImage => self.unsave_image(fields),
            Command::AddComment => self.add_comment(fields),
            Command::GetComments => self.get_comments(fields),
            Command::GetUser => self.get_user(fields),
            Command::Search => self.search(fields),
            Command::Echo => Ok(echo(tag.trim())),
        };
        match handled {
            Ok(reply) => Response::succeeded(command, reply),
            Err(refusal) => {
                debug!(
                    target: DISPATCH_TARGET,
                    command = command.as_str(),
                    reason = %refusal,
                    "command refused"
                );
                Response::refused(command, refusal.to_string())
            }
        }
    }

    fn login(&self, fields: Fields<'_>, session: &mut Session) -> Handled {
        let username = fields.required_str("username")?.trim();
        let password = fields.required_str("password")?;
        let user_id = self.store.authenticate(username, password)?;
        session.set_identity(username);
        let mut reply = Data::new();
        reply.insert("user_id".to_owned(), user_id.into());
        reply.insert("username".to_owned(), username.into());
        Ok(reply)
    }

    fn register(&self, fields: Fields<'_>) -> Handled {
        let username = fields.required_str("username")?;
        let password = fields.required_str("password")?;
        let email = fields.optional_text("email")?;
        let user_id = self.store.create_user(NewUser {
            username: username.to_owned(),
            password: password.to_owned(),
            email: email.map(str::to_owned),
        })?;
        let mut reply = Data::new();
        reply.insert("user_id".to_owned(), user_id.into());
        reply.insert("username".to_owned(), username.trim().into());
        Ok(reply)
    }

    fn upload_image(&self, fields: Fields<'_>) -> Handled {
        let user_id = fields.required_id("user_id")?;
        let filename = fields.optional_text("filename")?;
        let url = fields.optional_text("url")?;
        if filename.is_none() && url.is_none() {
            return Err(FieldError::Missing("filename").into());
        }
        let category = match fields.optional_text("category")? {
            Some(category) => Some(category),
            None => fields.optional_text("tags")?,
        };
        let image_data = fields
            .optional_text("image")?
            .map(decode_image)
            .transpose()?;
        let record = self.store.persist_image(NewImage {
            filename: filename.map(str::to_owned),
            url: url.map(str::to_owned),
            caption: fields.optional_text("caption")?.map(str::to_owned),
            category: category.map(str::to_owned),
            user_id,
            image_data,
        })?;
        let mut reply = Data::new();
        reply.insert("image_id".to_owned(), record.id.into());
        reply.insert("url".to_owned(), record.url.into());
        reply.insert("filename".to_owned(), record.filename.into());
        Ok(reply)
    }

    fn get_images(&self) -> Handled {
        let images = self.store.list_images()?;
        single("images", &images)
    }

    fn get_saved_images(&self, fields: Fields<'_>) -> Handled {
        let user_id = fields.required_id("user_id")?;
        let images = self.store.list_saved_images(user_id)?;
        single("images", &images)
    }

    fn save_image(&self, fields: Fields<'_>) -> Handled {
        let user_id = fields.required_id("user_id")?;
        let image_id = fields.required_id("image_id")?;
        self.store.save_image(user_id, image_id)?;
        let mut reply = Data::new();
        reply.insert("user_id".to_owned(), user_id.into());
        reply.insert("image_id".to_owned(), image_id.into());
        Ok(reply)
    }

    fn unsave_image(&self, fields: Fields<'_>) -> Handled {
        let user_id = fields.required_id("user_id")?;
        let image_id = fields.required_id("image_id")?;
        let removed = self.store.unsave_image(user_id, image_id)?;
        let mut reply = Data::new();
        reply.insert("user_id".to_owned(), user_id.into());
        reply.insert("image_id".to_owned(), image_id.into());
        reply.insert("success".to_owned(), removed.into());
        Ok(reply)
    }

    fn add_comment(&self, fields: Fields<'_>) -> Handled {
        let image_id = fields.required_id("image_id")?;
        let text = fields.required_str("text")?;
        let user_id = fields.optional_id("user_id")?;
        let comment_id = self.store.add_comment(NewComment {
            image_id,
            text: text.to_owned(),
            user_id,
        })?;
        let mut reply = Data::new();
        reply.insert("comment_id".to_owned(), comment_id.into());
        reply.insert("image_id".to_owned(), image_id.into());
        Ok(reply)
    }

    fn get_comments(&self, fields: Fields<'_>) -> Handled {
        let image_id = fields.required_id("image_id")?;
        let comments = self.store.list_comments(image_id)?;
        let mut reply = single("comments", &comments)?;
        reply.insert("image_id".to_owned(), image_id.into());
        Ok(reply)
    }

    fn get_user(&self, fields: Fields<'_>) -> Handled {
        let user_id = fields.required_id("user_id")?;
        let profile = self.store.user_profile(user_id)?;
        let mut reply = single("user", &profile.user)?;
        reply.insert("saved_count".to_owned(), profile.saved_count.into());
        reply.insert("uploaded_count".to_owned(), profile.uploaded_count.into());
        reply.insert("comment_count".to_owned(), profile.comment_count.into());
        Ok(reply)
    }

    fn search(&self, fields: Fields<'_>) -> Handled {
        let query = fields.required_str("query")?.trim();
        if query.is_empty() {
            return Err(Refusal::Invalid("Search query must not be empty".to_owned()));
        }
        let kind = match fields.optional_str("type")? {
            None => SearchKind::Posts,
            Some(raw) => raw
                .trim()
                .parse::<SearchKind>()
                .map_err(|_| Refusal::Invalid(format!("Unknown search type: {raw}")))?,
        };
        let results = match kind {
            SearchKind::Posts => self.search_posts(query, fields.optional_id("user_id")?)?,
            SearchKind::Users => serde_json::to_value(self.store.search_users(query)?)?,
        };
        let mut reply = Data::new();
        reply.insert("type".to_owned(), kind.as_ref().into());
        reply.insert("query".to_owned(), query.into());
        reply.insert("results".to_owned(), results);
        Ok(reply)
    }

    fn search_posts(&self, query: &str, viewer: Option<i64>) -> Result<Value, Refusal> {
        let images = self.store.search_images(query)?;
        let mut results = Vec::with_capacity(images.len());
        for image in images {
            let saved = match viewer {
                Some(user_id) => Some(self.store.is_image_saved(user_id, image.id)?),
                None => None,
            };
            let mut entry = serde_json::to_value(image)?;
            if let (Some(saved), Value::Object(map)) = (saved, &mut entry) {
                map.insert("is_saved".to_owned(), saved.into());
            }
            results.push(entry);
        }
        Ok(Value::Array(results))
    }
}

fn ping(fields: Fields<'_>) -> Data {
    let mut reply = Data::new();
    reply.insert("received_timestamp".to_owned(), fields.raw("timestamp"));
    reply.insert("server_timestamp".to_owned(), epoch_seconds().into());
    reply
}

fn logout(session: &mut Session) -> Data {
    let previous = session.clear_identity();
    let mut reply = Data::new();
    reply.insert("message".to_owned(), LOGOUT_MESSAGE.into());
    reply.insert(
        "username".to_owned(),
        previous.map_or(Value::Null, Value::String),
    );
    reply
}

fn echo(original_command: &str) -> Data {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    let mut reply = Data::new();
    reply.insert("message".to_owned(), ECHO_MESSAGE.into());
    reply.insert("original_command".to_owned(), original_command.into());
    reply.insert("timestamp".to_owned(), timestamp.into());
    reply
}

/// Decodes an inline upload, accepting an optional `data:` URI prefix.
fn decode_image(encoded: &str) -> Result<Vec<u8>, Refusal> {
    let payload = match encoded.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|error| Refusal::Invalid(format!("Invalid image data: {error}")))
}

fn single(key: &str, value: &impl Serialize) -> Handled {
    let mut reply = Data::new();
    reply.insert(key.to_owned(), serde_json::to_value(value)?);
    Ok(reply)
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
