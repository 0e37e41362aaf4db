//! Data service consumed by the command router.
//!
//! The router never touches storage directly. It calls a [`DataService`]
//! shared by every connection, so implementations must serialize their own
//! mutations. [`MemoryStore`] is the bundled implementation.

mod errors;
mod memory;
mod records;

pub use self::errors::StoreError;
pub use self::memory::MemoryStore;
pub use self::records::{
    CommentId, CommentRecord, ImageId, ImageRecord, NewComment, NewImage, NewUser, UserId,
    UserProfile, UserSummary,
};

/// CRUD-style operations the router executes on behalf of clients.
pub trait DataService: Send + Sync {
    /// Checks credentials and returns the matching account.
    fn authenticate(&self, username: &str, password: &str) -> Result<UserId, StoreError>;

    /// Registers a new account.
    fn create_user(&self, user: NewUser) -> Result<UserId, StoreError>;

    /// Stores image metadata and returns the stored record.
    fn persist_image(&self, image: NewImage) -> Result<ImageRecord, StoreError>;

    /// Lists every image, newest first.
    fn list_images(&self) -> Result<Vec<ImageRecord>, StoreError>;

    /// Lists the images a user saved, most recently saved first.
    fn list_saved_images(&self, user_id: UserId) -> Result<Vec<ImageRecord>, StoreError>;

    /// Adds an image to a user's saved set. Saving twice is refused.
    fn save_image(&self, user_id: UserId, image_id: ImageId) -> Result<(), StoreError>;

    /// Removes an image from a user's saved set, reporting whether anything
    /// was removed.
    fn unsave_image(&self, user_id: UserId, image_id: ImageId) -> Result<bool, StoreError>;

    /// Reports whether a user saved an image.
    fn is_image_saved(&self, user_id: UserId, image_id: ImageId) -> Result<bool, StoreError>;

    /// Attaches a comment to an image.
    fn add_comment(&self, comment: NewComment) -> Result<CommentId, StoreError>;

    /// Lists the comments on an image, oldest first.
    fn list_comments(&self, image_id: ImageId) -> Result<Vec<CommentRecord>, StoreError>;

    /// Finds images whose caption, category, file name or URL contains the
    /// query, ignoring case.
    fn search_images(&self, query: &str) -> Result<Vec<ImageRecord>, StoreError>;

    /// Finds users whose name contains the query, ignoring case.
    fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, StoreError>;

    /// Fetches an account with its activity counters.
    fn user_profile(&self, user_id: UserId) -> Result<UserProfile, StoreError>;
}
