//! Records exchanged between the router and a data service.

use serde::Serialize;

/// Identifier of a registered user.
pub type UserId = i64;
/// Identifier of a stored image.
pub type ImageId = i64;
/// Identifier of a comment.
pub type CommentId = i64;

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    /// Account identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Contact address, when supplied at registration.
    pub email: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// Account creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Requested login name.
    pub username: String,
    /// Clear-text password; stores keep only a digest.
    pub password: String,
    /// Optional contact address.
    pub email: Option<String>,
}

/// Image upload request.
///
/// At least one of `filename` and `url` is present; the store derives the
/// other when it is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    /// Client-side file name.
    pub filename: Option<String>,
    /// Location the image is served from.
    pub url: Option<String>,
    /// Free-text caption.
    pub caption: Option<String>,
    /// Category or tag list.
    pub category: Option<String>,
    /// Uploading user.
    pub user_id: UserId,
    /// Decoded image bytes, when the upload carried them inline.
    pub image_data: Option<Vec<u8>>,
}

/// Stored image metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    /// Image identifier.
    pub id: ImageId,
    /// File name.
    pub filename: String,
    /// Location the image is served from.
    pub url: String,
    /// Free-text caption.
    pub caption: Option<String>,
    /// Category or tag list.
    pub category: Option<String>,
    /// Uploading user.
    pub user_id: UserId,
    /// Uploader's login name, when known.
    pub username: Option<String>,
    /// Size of the inline image payload; zero when none was sent.
    pub size_bytes: usize,
    /// RFC 3339 upload time.
    pub created_at: String,
}

/// Comment creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    /// Commented image.
    pub image_id: ImageId,
    /// Comment text.
    pub text: String,
    /// Author, absent for anonymous comments.
    pub user_id: Option<UserId>,
}

/// Stored comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    /// Comment identifier.
    pub id: CommentId,
    /// Commented image.
    pub image_id: ImageId,
    /// Author, absent for anonymous comments.
    pub user_id: Option<UserId>,
    /// Author's login name, when known.
    pub username: Option<String>,
    /// Comment text.
    pub text: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// User account with activity counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    /// Account details.
    pub user: UserSummary,
    /// Images the user has saved.
    pub saved_count: usize,
    /// Images the user has uploaded.
    pub uploaded_count: usize,
    /// Comments the user has written.
    pub comment_count: usize,
}
