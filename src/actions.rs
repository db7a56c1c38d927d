use crate::models::ModNote;
use crate::platform::RedditApi;
use std::sync::Arc;

pub const SPAM_NOTE_LABEL: &str = "SPAM_WARNING";
pub const SPAM_NOTE_TEXT: &str = "Spammed via SpamBuster";

/// What happened to each half of a remove+annotate action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOutcome {
    pub removed: bool,
    pub noted: bool,
}

impl ActionOutcome {
    pub fn is_complete(&self) -> bool {
        self.removed && self.noted
    }
}

/// Removes an item as spam and leaves a mod note on its author.
#[derive(Clone)]
pub struct ActionExecutor {
    api: Arc<dyn RedditApi>,
}

impl ActionExecutor {
    pub fn new(api: Arc<dyn RedditApi>) -> Self {
        Self { api }
    }

    /// Attempts both the removal and the note exactly once. Failures are
    /// logged and reported in the outcome, never returned as errors.
    pub async fn remove_and_annotate(
        &self,
        item_id: &str,
        subreddit_name: &str,
        target_username: &str,
    ) -> ActionOutcome {
        let removed = match self.api.remove(item_id, true).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to remove {item_id} from r/{subreddit_name}: {e}");
                false
            }
        };

        let note = ModNote {
            label: SPAM_NOTE_LABEL.to_string(),
            subreddit: subreddit_name.to_string(),
            note: SPAM_NOTE_TEXT.to_string(),
            user: target_username.to_string(),
            reddit_id: item_id.to_string(),
        };
        let noted = match self.api.add_mod_note(&note).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to add mod note for {target_username} on {item_id}: {e}");
                false
            }
        };

        ActionOutcome { removed, noted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::MemoryPlatform;

    #[tokio::test]
    async fn test_remove_and_annotate() {
        let platform = Arc::new(MemoryPlatform::new("mod"));
        let executor = ActionExecutor::new(platform.clone());

        let outcome = executor
            .remove_and_annotate("t3_spam", "rust", "spammy")
            .await;

        assert!(outcome.is_complete());
        assert_eq!(platform.removals(), vec![("t3_spam".to_string(), true)]);
        assert_eq!(
            platform.notes(),
            vec![ModNote {
                label: "SPAM_WARNING".to_string(),
                subreddit: "rust".to_string(),
                note: "Spammed via SpamBuster".to_string(),
                user: "spammy".to_string(),
                reddit_id: "t3_spam".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_note_attempted_when_removal_fails() {
        let platform = Arc::new(MemoryPlatform::new("mod"));
        platform.fail_removal_of("t3_spam");
        let executor = ActionExecutor::new(platform.clone());

        let outcome = executor
            .remove_and_annotate("t3_spam", "rust", "spammy")
            .await;

        assert!(!outcome.removed);
        assert!(outcome.noted);
        assert_eq!(platform.notes().len(), 1);
    }

    #[tokio::test]
    async fn test_removal_stands_when_note_fails() {
        let platform = Arc::new(MemoryPlatform::new("mod"));
        platform.fail_notes();
        let executor = ActionExecutor::new(platform.clone());

        let outcome = executor
            .remove_and_annotate("t1_spam", "rust", "spammy")
            .await;

        assert_eq!(
            outcome,
            ActionOutcome {
                removed: true,
                noted: false
            }
        );
        assert_eq!(platform.removals().len(), 1);
    }
}
