//! In-memory platform used by the demo mode and the test suites.

use super::{Notifier, RedditApi};
use crate::error::PlatformError;
use crate::models::{BanRequest, ContentItem, CurrentUser, ItemKind, ModNote, UserProfile};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, UserProfile>,
    items: Vec<ContentItem>,
    unlisted: HashSet<String>,
    moderator: String,

    removals: Vec<(String, bool)>,
    notes: Vec<ModNote>,
    bans: Vec<BanRequest>,
    user_lookups: Vec<String>,
    history_requests: Vec<(String, usize)>,

    failing_removals: HashSet<String>,
    fail_notes: bool,
    fail_history: bool,
    fail_ban: bool,
    ignore_history_limit: bool,
}

/// Recording fake of [`RedditApi`] with failure injection.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    pub fn new(moderator: &str) -> Self {
        let platform = Self::default();
        platform.state().moderator = moderator.to_string();
        platform
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user(&self, profile: UserProfile) {
        self.state().users.insert(profile.id.clone(), profile);
    }

    /// Items are kept in insertion order, which is treated as newest first.
    pub fn add_item(&self, item: ContentItem) {
        self.state().items.push(item);
    }

    /// An item that can be looked up by id but is too old to show up in
    /// its author's history listing.
    pub fn add_unlisted_item(&self, item: ContentItem) {
        let mut state = self.state();
        state.unlisted.insert(item.id.clone());
        state.items.push(item);
    }

    pub fn fail_removal_of(&self, id: &str) {
        self.state().failing_removals.insert(id.to_string());
    }

    pub fn fail_notes(&self) {
        self.state().fail_notes = true;
    }

    pub fn fail_history(&self) {
        self.state().fail_history = true;
    }

    pub fn fail_ban(&self) {
        self.state().fail_ban = true;
    }

    /// Makes the history fetch return everything, as a misbehaving client would.
    pub fn ignore_history_limit(&self) {
        self.state().ignore_history_limit = true;
    }

    pub fn removals(&self) -> Vec<(String, bool)> {
        self.state().removals.clone()
    }

    pub fn notes(&self) -> Vec<ModNote> {
        self.state().notes.clone()
    }

    pub fn bans(&self) -> Vec<BanRequest> {
        self.state().bans.clone()
    }

    pub fn user_lookups(&self) -> Vec<String> {
        self.state().user_lookups.clone()
    }

    pub fn history_requests(&self) -> Vec<(String, usize)> {
        self.state().history_requests.clone()
    }

    fn find_item(&self, id: &str, kind: ItemKind) -> Result<ContentItem, PlatformError> {
        self.state()
            .items
            .iter()
            .find(|item| item.id == id && item.kind == kind)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("{kind} {id}")))
    }
}

#[async_trait]
impl RedditApi for MemoryPlatform {
    async fn get_user_by_id(&self, id: &str) -> Result<UserProfile, PlatformError> {
        let mut state = self.state();
        state.user_lookups.push(id.to_string());
        state
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("user {id}")))
    }

    async fn get_post_by_id(&self, id: &str) -> Result<ContentItem, PlatformError> {
        self.find_item(id, ItemKind::Post)
    }

    async fn get_comment_by_id(&self, id: &str) -> Result<ContentItem, PlatformError> {
        self.find_item(id, ItemKind::Comment)
    }

    async fn get_comments_and_posts_by_user(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<ContentItem>, PlatformError> {
        let mut state = self.state();
        state.history_requests.push((username.to_string(), limit));
        if state.fail_history {
            return Err(PlatformError::Injected("history unavailable".to_string()));
        }

        let limit = if state.ignore_history_limit {
            usize::MAX
        } else {
            limit
        };
        Ok(state
            .items
            .iter()
            .filter(|item| item.author_name == username && !state.unlisted.contains(&item.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn remove(&self, id: &str, is_spam: bool) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.removals.push((id.to_string(), is_spam));
        if state.failing_removals.contains(id) {
            return Err(PlatformError::Injected(format!("cannot remove {id}")));
        }
        Ok(())
    }

    async fn add_mod_note(&self, note: &ModNote) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.notes.push(note.clone());
        if state.fail_notes {
            return Err(PlatformError::Injected("mod notes unavailable".to_string()));
        }
        Ok(())
    }

    async fn ban_user(&self, ban: &BanRequest) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.bans.push(ban.clone());
        if state.fail_ban {
            return Err(PlatformError::Injected(format!("cannot ban {}", ban.username)));
        }
        Ok(())
    }

    async fn get_current_user(&self) -> Result<CurrentUser, PlatformError> {
        Ok(CurrentUser {
            username: self.state().moderator.clone(),
        })
    }
}

/// Keeps every toast for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_toast(&self, text: &str) {
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }
}
