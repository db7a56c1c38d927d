//! Seams to the content platform and its moderator UI.

pub mod memory;
pub mod reddit;

use crate::error::PlatformError;
use crate::models::{BanRequest, ContentItem, CurrentUser, ModNote, UserProfile};
use async_trait::async_trait;

/// Content platform operations used by the moderation pipeline.
#[async_trait]
pub trait RedditApi: Send + Sync {
    async fn get_user_by_id(&self, id: &str) -> Result<UserProfile, PlatformError>;

    async fn get_post_by_id(&self, id: &str) -> Result<ContentItem, PlatformError>;

    async fn get_comment_by_id(&self, id: &str) -> Result<ContentItem, PlatformError>;

    /// Most recent posts and comments of `username`, newest first, never
    /// more than `limit` items.
    async fn get_comments_and_posts_by_user(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<ContentItem>, PlatformError>;

    async fn remove(&self, id: &str, is_spam: bool) -> Result<(), PlatformError>;

    async fn add_mod_note(&self, note: &ModNote) -> Result<(), PlatformError>;

    async fn ban_user(&self, ban: &BanRequest) -> Result<(), PlatformError>;

    async fn get_current_user(&self) -> Result<CurrentUser, PlatformError>;
}

/// Ephemeral messages shown to the invoking moderator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show_toast(&self, text: &str);
}

/// Prints toasts to stdout, for the command line host.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn show_toast(&self, text: &str) {
        log::debug!("toast: {text}");
        println!("{text}");
    }
}
