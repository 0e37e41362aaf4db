use std::str::FromStr;

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

/// Response tag for envelope-level and unknown-command failures.
pub const ERROR_TAG: &str = "ERROR";

/// Request tags the server understands.
///
/// Parsing trims whitespace and ignores ASCII case; `TEST` is accepted as an
/// alias for [`Command::Echo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Liveness probe.
    Ping,
    /// Credential check.
    Login,
    /// Account creation.
    Register,
    /// Ends the logical session on a connection.
    Logout,
    /// Stores a new image record.
    UploadImage,
    /// Lists every image.
    GetImages,
    /// Lists the images a user saved.
    GetSavedImages,
    /// Bookmarks an image for a user.
    SaveImage,
    /// Removes a bookmark.
    UnsaveImage,
    /// Attaches a comment to an image.
    AddComment,
    /// Lists the comments on an image.
    GetComments,
    /// Fetches a user profile with activity counts.
    GetUser,
    /// Searches posts or users.
    Search,
    /// Reflects the request back to the caller.
    Echo,
}

impl Command {
    /// Canonical upper-case request tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Tag the server answers with when the command succeeds.
    #[must_use]
    pub const fn success_tag(self) -> &'static str {
        match self {
            Self::Ping => "PONG",
            Self::Login => "LOGIN_SUCCESS",
            Self::Register => "REGISTER_SUCCESS",
            Self::Logout => "LOGOUT_SUCCESS",
            Self::UploadImage => "UPLOAD_SUCCESS",
            Self::GetImages => "IMAGES",
            Self::GetSavedImages => "SAVED_IMAGES",
            Self::SaveImage => "SAVE_IMAGE_SUCCESS",
            Self::UnsaveImage => "UNSAVE_IMAGE_SUCCESS",
            Self::AddComment => "ADD_COMMENT_SUCCESS",
            Self::GetComments => "COMMENTS",
            Self::GetUser => "USER_PROFILE",
            Self::Search => "SEARCH_RESULTS",
            Self::Echo => "ECHO",
        }
    }

    /// Tag the server answers with when the command is refused.
    ///
    /// Commands that cannot fail fall back to [`ERROR_TAG`].
    #[must_use]
    pub const fn failure_tag(self) -> &'static str {
        match self {
            Self::Login => "LOGIN_FAILED",
            Self::Register => "REGISTER_FAILED",
            Self::UploadImage => "UPLOAD_FAILED",
            Self::GetImages => "GET_IMAGES_FAILED",
            Self::GetSavedImages => "GET_SAVED_FAILED",
            Self::SaveImage => "SAVE_IMAGE_FAILED",
            Self::UnsaveImage => "UNSAVE_IMAGE_FAILED",
            Self::AddComment => "ADD_COMMENT_FAILED",
            Self::GetComments => "GET_COMMENTS_FAILED",
            Self::GetUser => "GET_USER_FAILED",
            Self::Search => "SEARCH_FAILED",
            Self::Ping | Self::Logout | Self::Echo => ERROR_TAG,
        }
    }

    /// Looks up a request tag, returning `None` for unknown commands.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("TEST") {
            return Some(Self::Echo);
        }
        Self::iter().find(|command| command.as_str().eq_ignore_ascii_case(tag))
    }

    /// Every command in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when a tag names no known command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::parse(tag).ok_or_else(|| UnknownCommand(tag.trim().to_owned()))
    }
}

/// Returns `true` for `ERROR` and any `*_FAILED` response tag.
#[must_use]
pub fn is_failure_tag(tag: &str) -> bool {
    tag == ERROR_TAG || tag.ends_with("_FAILED")
}
