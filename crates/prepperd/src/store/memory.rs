//! In-memory [`DataService`] guarded by a single mutex.

use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::DataService;
use super::errors::StoreError;
use super::records::{
    CommentId, CommentRecord, ImageId, ImageRecord, NewComment, NewImage, NewUser, UserId,
    UserProfile, UserSummary,
};

const UPLOAD_PREFIX: &str = "/static/uploads";

const SAMPLE_USER: (&str, &str, &str) = ("Andy", "password", "andy@preppers.app");

const SAMPLE_IMAGES: &[(&str, &str)] = &[
    ("Best Survival Tools for Preppers", "Tools"),
    ("Prepare for Food Shortages", "Meal Prep"),
    ("Amazing Survival Recipes", "Meal Prep"),
    ("YOU NEED TO KNOW THESE LIFE HACKS!", "Hacks"),
    (
        "Your emergency stockpile isnt complete without these 100 things",
        "Tools",
    ),
    ("World War 3 is Coming, are you Prepared??", "Tips"),
    ("Want to Survive? Better read this..", "Tips"),
    ("Clothes that Guarantee Survival", "Clothes"),
    ("If you don't have these in your pantry, uh oh", "Meal Prep"),
    (
        "Rebuild after the apocalypse is over with these plants",
        "Gardening",
    ),
    (
        "Flowers will be worth millions soon, enjoy them now",
        "Gardening",
    ),
];

const SAMPLE_COMMENTS: &[(ImageId, &str)] = &[
    (2, "helped, my bunker is stocked now"),
    (2, "omg, can't wait to eat this"),
    (4, "Great hacks!"),
    (3, "I survived thanks to this post"),
    (8, "very stylish 10/10"),
];

#[derive(Debug)]
struct StoredUser {
    summary: UserSummary,
    password_digest: String,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<StoredUser>,
    images: Vec<ImageRecord>,
    saved: Vec<(UserId, ImageId)>,
    comments: Vec<CommentRecord>,
    last_user: UserId,
    last_image: ImageId,
    last_comment: CommentId,
}

impl State {
    fn user(&self, user_id: UserId) -> Result<&StoredUser, StoreError> {
        self.users
            .iter()
            .find(|user| user.summary.id == user_id)
            .ok_or(StoreError::UnknownUser(user_id))
    }

    fn image(&self, image_id: ImageId) -> Result<&ImageRecord, StoreError> {
        self.images
            .iter()
            .find(|image| image.id == image_id)
            .ok_or(StoreError::UnknownImage(image_id))
    }

    fn username(&self, user_id: UserId) -> Option<String> {
        self.user(user_id)
            .ok()
            .map(|user| user.summary.username.clone())
    }

    fn newest_first<'a>(
        images: impl DoubleEndedIterator<Item = &'a ImageRecord>,
    ) -> Vec<ImageRecord> {
        images.rev().cloned().collect()
    }

    fn insert_user(&mut self, user: NewUser) -> Result<UserId, StoreError> {
        let username = user.username.trim();
        if username.is_empty() || user.password.is_empty() {
            return Err(StoreError::EmptyCredentials);
        }
        if self
            .users
            .iter()
            .any(|existing| existing.summary.username == username)
        {
            return Err(StoreError::UsernameTaken);
        }
        self.last_user += 1;
        self.users.push(StoredUser {
            summary: UserSummary {
                id: self.last_user,
                username: username.to_owned(),
                email: user.email.filter(|email| !email.trim().is_empty()),
                created_at: timestamp(),
            },
            password_digest: password_digest(&user.password),
        });
        Ok(self.last_user)
    }

    fn insert_image(&mut self, image: NewImage) -> Result<ImageRecord, StoreError> {
        let username = self.user(image.user_id)?.summary.username.clone();
        self.last_image += 1;
        let id = self.last_image;
        let filename = image
            .filename
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                image
                    .url
                    .as_deref()
                    .and_then(|url| url.rsplit('/').next())
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| format!("image-{id}"));
        let url = image
            .url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| format!("{UPLOAD_PREFIX}/{filename}"));
        let record = ImageRecord {
            id,
            filename,
            url,
            caption: image.caption,
            category: image.category,
            user_id: image.user_id,
            username: Some(username),
            size_bytes: image.image_data.as_ref().map_or(0, Vec::len),
            created_at: timestamp(),
        };
        self.images.push(record.clone());
        Ok(record)
    }

    fn insert_comment(&mut self, comment: NewComment) -> Result<CommentId, StoreError> {
        let text = comment.text.trim();
        if text.is_empty() {
            return Err(StoreError::EmptyComment);
        }
        self.image(comment.image_id)?;
        if let Some(user_id) = comment.user_id {
            self.user(user_id)?;
        }
        let username = comment.user_id.and_then(|user_id| self.username(user_id));
        self.last_comment += 1;
        self.comments.push(CommentRecord {
            id: self.last_comment,
            image_id: comment.image_id,
            user_id: comment.user_id,
            username,
            text: text.to_owned(),
            created_at: timestamp(),
        });
        Ok(self.last_comment)
    }
}

/// Thread-safe [`DataService`] holding everything in process memory.
///
/// Passwords are kept as SHA-256 hex digests. Every operation takes the same
/// lock, so concurrent saves of one image by one user cannot both succeed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding a demo account (`Andy` / `password`), eleven
    /// sample images with identifiers `1..=11` and a handful of anonymous
    /// comments.
    #[must_use]
    pub fn with_sample_data() -> Self {
        let mut state = State::default();
        seed_samples(&mut state);
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_owned()))
    }
}

fn seed_samples(state: &mut State) {
    let (username, password, email) = SAMPLE_USER;
    let seeded = state.insert_user(NewUser {
        username: username.to_owned(),
        password: password.to_owned(),
        email: Some(email.to_owned()),
    });
    let Ok(owner) = seeded else {
        return;
    };
    for (index, (caption, category)) in (1_usize..).zip(SAMPLE_IMAGES) {
        let image = NewImage {
            filename: Some(format!("{index}.jpg")),
            url: Some(format!("/static/images/{index}.jpg")),
            caption: Some((*caption).to_owned()),
            category: Some((*category).to_owned()),
            user_id: owner,
            image_data: None,
        };
        if state.insert_image(image).is_err() {
            return;
        }
    }
    for (image_id, text) in SAMPLE_COMMENTS {
        let comment = NewComment {
            image_id: *image_id,
            text: (*text).to_owned(),
            user_id: None,
        };
        if state.insert_comment(comment).is_err() {
            return;
        }
    }
}

impl DataService for MemoryStore {
    fn authenticate(&self, username: &str, password: &str) -> Result<UserId, StoreError> {
        let state = self.lock()?;
        let digest = password_digest(password);
        state
            .users
            .iter()
            .find(|user| user.summary.username == username.trim() && user.password_digest == digest)
            .map(|user| user.summary.id)
            .ok_or(StoreError::InvalidCredentials)
    }

    fn create_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        self.lock()?.insert_user(user)
    }

    fn persist_image(&self, image: NewImage) -> Result<ImageRecord, StoreError> {
        self.lock()?.insert_image(image)
    }

    fn list_images(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let state = self.lock()?;
        Ok(State::newest_first(state.images.iter()))
    }

    fn list_saved_images(&self, user_id: UserId) -> Result<Vec<ImageRecord>, StoreError> {
        let state = self.lock()?;
        state.user(user_id)?;
        Ok(state
            .saved
            .iter()
            .rev()
            .filter(|(owner, _)| *owner == user_id)
            .filter_map(|(_, image_id)| state.image(*image_id).ok().cloned())
            .collect())
    }

    fn save_image(&self, user_id: UserId, image_id: ImageId) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.user(user_id)?;
        state.image(image_id)?;
        if state.saved.contains(&(user_id, image_id)) {
            return Err(StoreError::AlreadySaved);
        }
        state.saved.push((user_id, image_id));
        Ok(())
    }

    fn unsave_image(&self, user_id: UserId, image_id: ImageId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let before = state.saved.len();
        state.saved.retain(|entry| *entry != (user_id, image_id));
        Ok(state.saved.len() != before)
    }

    fn is_image_saved(&self, user_id: UserId, image_id: ImageId) -> Result<bool, StoreError> {
        Ok(self.lock()?.saved.contains(&(user_id, image_id)))
    }

    fn add_comment(&self, comment: NewComment) -> Result<CommentId, StoreError> {
        self.lock()?.insert_comment(comment)
    }

    fn list_comments(&self, image_id: ImageId) -> Result<Vec<CommentRecord>, StoreError> {
        let state = self.lock()?;
        state.image(image_id)?;
        Ok(state
            .comments
            .iter()
            .filter(|comment| comment.image_id == image_id)
            .cloned()
            .collect())
    }

    fn search_images(&self, query: &str) -> Result<Vec<ImageRecord>, StoreError> {
        let needle = query.trim().to_lowercase();
        let state = self.lock()?;
        Ok(State::newest_first(
            state.images.iter().filter(|image| image_matches(image, &needle)),
        ))
    }

    fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, StoreError> {
        let needle = query.trim().to_lowercase();
        let state = self.lock()?;
        Ok(state
            .users
            .iter()
            .filter(|user| user.summary.username.to_lowercase().contains(&needle))
            .map(|user| user.summary.clone())
            .collect())
    }

    fn user_profile(&self, user_id: UserId) -> Result<UserProfile, StoreError> {
        let state = self.lock()?;
        let user = state.user(user_id)?.summary.clone();
        Ok(UserProfile {
            user,
            saved_count: state
                .saved
                .iter()
                .filter(|(owner, _)| *owner == user_id)
                .count(),
            uploaded_count: state
                .images
                .iter()
                .filter(|image| image.user_id == user_id)
                .count(),
            comment_count: state
                .comments
                .iter()
                .filter(|comment| comment.user_id == Some(user_id))
                .count(),
        })
    }
}

fn image_matches(image: &ImageRecord, needle: &str) -> bool {
    [
        image.caption.as_deref(),
        image.category.as_deref(),
        Some(image.filename.as_str()),
        Some(image.url.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
