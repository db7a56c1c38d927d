//! "Bust spammer" menu action: remove an author's recent content from the
//! subreddit and ban them.

use crate::actions::ActionExecutor;
use crate::error::ModerationError;
use crate::models::{BanRequest, ContentItem, ItemKind};
use crate::platform::{Notifier, RedditApi};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Hard cap on how much of the author's history is inspected.
pub const PURGE_HISTORY_LIMIT: usize = 128;
pub const BAN_REASON: &str = "Spam";
pub const MENU_LABEL: &str = "Bust spammer";

/// Menu target as handed over by the host: where the menu was opened and
/// the id of the item it was opened on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeTarget {
    pub location: String,
    pub target_id: String,
}

impl PurgeTarget {
    pub fn new(location: &str, target_id: &str) -> Self {
        Self {
            location: location.to_string(),
            target_id: target_id.to_string(),
        }
    }

    fn kind(&self) -> Option<ItemKind> {
        match self.location.as_str() {
            "post" => Some(ItemKind::Post),
            "comment" => Some(ItemKind::Comment),
            _ => None,
        }
    }

    fn not_found(&self) -> ModerationError {
        ModerationError::ItemNotFound {
            location: self.location.clone(),
            id: self.target_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub username: String,
    pub subreddit_name: String,
    /// Items of the author found in the target subreddit.
    pub removed_count: usize,
    /// Matched items whose removal or note did not go through.
    pub failed_count: usize,
}

#[derive(Clone)]
pub struct PurgeOrchestrator {
    api: Arc<dyn RedditApi>,
    executor: ActionExecutor,
}

impl PurgeOrchestrator {
    pub fn new(api: Arc<dyn RedditApi>) -> Self {
        Self {
            executor: ActionExecutor::new(api.clone()),
            api,
        }
    }

    /// Runs the whole purge. Once the history has been fetched the ban is
    /// always attempted, whatever happened to the individual removals.
    pub async fn purge_and_ban(
        &self,
        target: &PurgeTarget,
        notifier: &dyn Notifier,
    ) -> Result<PurgeReport, ModerationError> {
        let thing = match self.resolve_target(target).await {
            Ok(thing) => thing,
            Err(e) => {
                notifier.show_toast(&e.to_string()).await;
                return Err(e);
            }
        };
        let user = thing.author_name.clone();

        notifier
            .show_toast(&format!("Sneaking and snooping {user}'s account"))
            .await;

        let history = match self
            .api
            .get_comments_and_posts_by_user(&user, PURGE_HISTORY_LIMIT)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                let err = ModerationError::upstream("fetch user history", e);
                notifier
                    .show_toast(&format!("Could not read {user}'s content: {err}"))
                    .await;
                return Err(err);
            }
        };

        let mut report = PurgeReport {
            username: user.clone(),
            subreddit_name: thing.subreddit_name.clone(),
            removed_count: 0,
            failed_count: 0,
        };

        for item in history.iter().take(PURGE_HISTORY_LIMIT) {
            if item.subreddit_id != thing.subreddit_id {
                continue;
            }

            let outcome = self
                .executor
                .remove_and_annotate(&item.id, &thing.subreddit_name, &user)
                .await;
            if outcome.is_complete() {
                log::info!(
                    "Item {} spammed by SpamBuster on subreddit {}",
                    item.id,
                    thing.subreddit_name
                );
            } else {
                report.failed_count += 1;
            }
            report.removed_count += 1;
        }

        let mut summary = format!(
            "Purged and spammed {} items of {user}'s content from {}.",
            report.removed_count, thing.subreddit_name
        );
        if report.failed_count > 0 {
            summary.push_str(&format!(" {} could not be fully removed.", report.failed_count));
        }
        notifier.show_toast(&summary).await;

        if let Err(e) = self.ban_author(&thing).await {
            notifier
                .show_toast(&format!("Failed to ban {user} from {}: {e}", thing.subreddit_name))
                .await;
            return Err(e);
        }

        notifier
            .show_toast(&format!("Banned {user} from {}", thing.subreddit_name))
            .await;
        Ok(report)
    }

    async fn resolve_target(&self, target: &PurgeTarget) -> Result<ContentItem, ModerationError> {
        let kind = target.kind().ok_or_else(|| target.not_found())?;
        let lookup = match kind {
            ItemKind::Post => self.api.get_post_by_id(&target.target_id).await,
            ItemKind::Comment => self.api.get_comment_by_id(&target.target_id).await,
        };

        lookup.map_err(|e| {
            log::warn!("Lookup of {kind} {} failed: {e}", target.target_id);
            target.not_found()
        })
    }

    async fn ban_author(&self, thing: &ContentItem) -> Result<(), ModerationError> {
        let moderator = self
            .api
            .get_current_user()
            .await
            .map_err(|e| ModerationError::upstream("look up current moderator", e))?;

        let ban = BanRequest {
            subreddit_name: thing.subreddit_name.clone(),
            username: thing.author_name.clone(),
            context: thing.id.clone(),
            reason: BAN_REASON.to_string(),
            note: format!("Banned via SpamBuster by {}", moderator.username),
        };

        self.api
            .ban_user(&ban)
            .await
            .map_err(|e| ModerationError::upstream("ban user", e))
    }
}
