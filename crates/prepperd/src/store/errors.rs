use thiserror::Error;

use super::records::{ImageId, UserId};

/// Refusals and failures reported by a [`DataService`](super::DataService).
///
/// The `Display` text is returned to clients verbatim in the `message` field
/// of `<COMMAND>_FAILED` responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Username and password do not match an account.
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// Registration used a name that is already taken.
    #[error("Username already exists")]
    UsernameTaken,
    /// Registration supplied a blank username or password.
    #[error("Username and password must not be empty")]
    EmptyCredentials,
    /// No account has the given identifier.
    #[error("User {0} not found")]
    UnknownUser(UserId),
    /// No image has the given identifier.
    #[error("Image {0} not found")]
    UnknownImage(ImageId),
    /// The image is already in the user's saved set.
    #[error("Image already saved by this user")]
    AlreadySaved,
    /// Comment text was blank.
    #[error("Comment text must not be empty")]
    EmptyComment,
    /// The backing service cannot serve requests.
    #[error("Data service unavailable: {0}")]
    Unavailable(String),
}
