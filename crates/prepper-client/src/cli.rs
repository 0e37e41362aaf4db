//! Command-line interface definitions for the `prepper` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::SearchKind;

/// Talks to a Prepper server and prints each response body as JSON.
///
/// Configuration flags (`--host`, `--port` and friends) must come before the
/// subcommand.
#[derive(Parser, Debug)]
#[command(name = "prepper", disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Checks that the server is alive.
    Ping {
        /// Timestamp echoed back as `received_timestamp`; defaults to now.
        #[arg(long)]
        timestamp: Option<f64>,
    },
    /// Asks the server to reflect a message.
    Echo {
        /// Message to send.
        #[arg(default_value = "")]
        message: String,
    },
    /// Verifies account credentials.
    Login { username: String, password: String },
    /// Creates an account.
    Register {
        username: String,
        password: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Ends the session on the connection.
    Logout,
    /// Publishes an image from a local file or an external URL.
    Upload {
        /// Uploading account.
        #[arg(long)]
        user_id: u64,
        /// Local image to send.
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,
        /// Externally hosted image location.
        #[arg(long)]
        url: Option<String>,
        /// Stored file name; defaults to the name of `--file`.
        #[arg(long)]
        filename: Option<String>,
        #[arg(long)]
        caption: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Lists every image.
    Images,
    /// Lists the images an account saved.
    Saved { user_id: u64 },
    /// Bookmarks an image.
    Save { user_id: u64, image_id: u64 },
    /// Removes a bookmark.
    Unsave { user_id: u64, image_id: u64 },
    /// Comments on an image.
    Comment {
        image_id: u64,
        text: String,
        /// Author; the comment is anonymous when omitted.
        #[arg(long)]
        user_id: Option<u64>,
    },
    /// Lists the comments on an image.
    Comments { image_id: u64 },
    /// Shows an account profile.
    User { user_id: u64 },
    /// Searches posts or accounts.
    Search {
        query: String,
        #[arg(long = "type", value_enum, default_value_t = SearchKind::Posts)]
        kind: SearchKind,
        /// Marks post results the account has saved.
        #[arg(long)]
        user_id: Option<u64>,
    },
    /// Sends an arbitrary command with a JSON object as its data.
    Raw {
        command: String,
        #[arg(default_value = "{}")]
        data: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["prepper", "ping"])]
    #[case(&["prepper", "save", "1", "9"])]
    #[case(&["prepper", "search", "garden", "--type", "users"])]
    #[case(&["prepper", "raw", "PING", "{\"timestamp\": 1}"])]
    fn known_invocations_parse(#[case] args: &[&str]) {
        Cli::try_parse_from(args).expect("invocation should parse");
    }

    #[test]
    fn upload_refuses_both_file_and_url() {
        let result = Cli::try_parse_from([
            "prepper",
            "upload",
            "--user-id",
            "1",
            "--file",
            "a.png",
            "--url",
            "https://example.com/a.png",
        ]);
        assert!(result.is_err());
    }
}
