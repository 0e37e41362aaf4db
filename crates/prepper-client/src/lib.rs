//! Client for the Prepper request/response protocol.
//!
//! [`Client`] holds at most one TCP connection to a `prepperd` server and
//! performs strictly alternating request/response exchanges over it. Failures
//! come back as [`ClientError`] values and leave the client disconnected, so
//! the next call dials a fresh socket.
//!
//! ```no_run
//! use prepper_client::{Client, ClientSettings};
//!
//! # fn main() -> Result<(), prepper_client::ClientError> {
//! let mut client = Client::new(ClientSettings::default());
//! let pong = client.ping_at(1000.0)?;
//! assert_eq!(pong.command(), "PONG");
//! # Ok(())
//! # }
//! ```
//!
//! The `prepper` binary wraps the same client behind one subcommand per
//! request type; see [`run`].

mod cli;
mod client;
mod config;
mod errors;
mod response;
mod transport;

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind;
use ortho_config::OrthoError;
use serde_json::{Value, json};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use prepper_config::Config;
use prepper_protocol::Data;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, split_arguments};

pub use client::{Client, ClientSettings, ImageUpload, SearchKind};
pub use errors::ClientError;
pub use response::Response;

pub(crate) const CLIENT_TARGET: &str = "prepper_client";

const EXIT_REFUSED: u8 = 1;
const EXIT_UNAVAILABLE: u8 = 2;

#[derive(Debug, Error)]
enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to read image {path}: {source}")]
    ReadImage { path: PathBuf, source: io::Error },
    #[error("request data must be a JSON object: {0}")]
    RawData(String),
    #[error(transparent)]
    Request(#[from] ClientError),
    #[error("failed to write response: {0}")]
    WriteOutput(io::Error),
}

/// Runs the `prepper` CLI with the provided arguments and output streams.
///
/// Exit status is `0` when the server answered with a success tag, `1` when
/// it answered with `ERROR` or a `*_FAILED` tag, and `2` when no answer was
/// obtained (bad arguments, configuration or transport failure).
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, W, E, L>(args: I, stdout: &mut W, stderr: &mut E, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match execute(&args, stdout, loader) {
        Ok(code) => code,
        Err(AppError::CliUsage(error))
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "prepper: {error}");
            ExitCode::from(EXIT_UNAVAILABLE)
        }
    }
}

fn execute<W, L>(args: &[OsString], stdout: &mut W, loader: &L) -> Result<ExitCode, AppError>
where
    W: Write,
    L: ConfigLoader,
{
    let split = split_arguments(args);
    let cli = Cli::try_parse_from(&split.command_arguments).map_err(AppError::CliUsage)?;
    let config = loader
        .load(&split.config_arguments)
        .map_err(AppError::LoadConfiguration)?;
    install_logging(&config);

    let mut client = Client::new(ClientSettings::from_config(&config));
    let response = dispatch(&mut client, cli.command)?;
    let body = json!({
        "command": response.command(),
        "data": Value::Object(response.data().clone()),
    });
    write_body(stdout, &body).map_err(AppError::WriteOutput)?;

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_REFUSED)
    })
}

fn dispatch(client: &mut Client, command: CliCommand) -> Result<Response, AppError> {
    let response = match command {
        CliCommand::Ping { timestamp } => match timestamp {
            Some(timestamp) => client.ping_at(timestamp),
            None => client.ping(),
        },
        CliCommand::Echo { message } => client.echo(&message),
        CliCommand::Login { username, password } => client.login(&username, &password),
        CliCommand::Register {
            username,
            password,
            email,
        } => client.register(&username, &password, email.as_deref()),
        CliCommand::Logout => client.logout(),
        CliCommand::Upload {
            user_id,
            file,
            url,
            filename,
            caption,
            category,
        } => {
            let mut upload = ImageUpload {
                user_id,
                filename,
                url,
                caption,
                category,
                bytes: None,
            };
            if let Some(path) = file {
                attach_file(&mut upload, &path)?;
            }
            client.upload_image(upload)
        }
        CliCommand::Images => client.get_images(),
        CliCommand::Saved { user_id } => client.get_saved_images(user_id),
        CliCommand::Save { user_id, image_id } => client.save_image(user_id, image_id),
        CliCommand::Unsave { user_id, image_id } => client.unsave_image(user_id, image_id),
        CliCommand::Comment {
            image_id,
            text,
            user_id,
        } => client.add_comment(image_id, &text, user_id),
        CliCommand::Comments { image_id } => client.get_comments(image_id),
        CliCommand::User { user_id } => client.get_user(user_id),
        CliCommand::Search {
            query,
            kind,
            user_id,
        } => client.search(kind, &query, user_id),
        CliCommand::Raw { command, data } => client.send_request(&command, parse_raw_data(&data)?),
    };
    response.map_err(AppError::from)
}

fn attach_file(upload: &mut ImageUpload, path: &Path) -> Result<(), AppError> {
    let bytes = fs::read(path).map_err(|source| AppError::ReadImage {
        path: path.to_path_buf(),
        source,
    })?;
    if upload.filename.is_none() {
        upload.filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
    }
    upload.bytes = Some(bytes);
    Ok(())
}

fn parse_raw_data(text: &str) -> Result<Data, AppError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(data)) => Ok(data),
        Ok(other) => Err(AppError::RawData(format!("got {other}"))),
        Err(error) => Err(AppError::RawData(error.to_string())),
    }
}

fn write_body<W: Write>(stdout: &mut W, body: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *stdout, body)?;
    writeln!(stdout)?;
    stdout.flush()
}

fn install_logging(config: &Config) {
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .try_init();
}
