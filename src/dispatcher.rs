//! Routes submission events through the classifier and, for spam, the
//! action executor.

use crate::actions::{ActionExecutor, ActionOutcome};
use crate::classifier::{classify, SpamVerdict};
use crate::error::ConfigError;
use crate::event::{SubmissionEvent, TriggerEvent};
use crate::models::ItemKind;
use crate::platform::RedditApi;
use crate::settings::{ListenerScope, ModerationConfig, SettingsStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// How a single event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Settings were missing or unreadable; nothing was done.
    ConfigUnavailable(ConfigError),
    /// The author profile could not be fetched.
    ProfileUnavailable(String),
    /// The event was not a post or comment submission.
    Rejected(String),
    /// The event kind is not covered by the listener scope.
    OutOfScope(ItemKind),
    NotSpam(SpamVerdict),
    Actioned {
        verdict: SpamVerdict,
        outcome: ActionOutcome,
    },
}

impl DispatchOutcome {
    pub fn was_classified(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::NotSpam(_) | DispatchOutcome::Actioned { .. }
        )
    }
}

pub fn scope_matches(scope: ListenerScope, kind: ItemKind) -> bool {
    match scope {
        ListenerScope::Both => true,
        ListenerScope::Posts => kind == ItemKind::Post,
        ListenerScope::Comments => kind == ItemKind::Comment,
    }
}

#[derive(Clone)]
pub struct EventDispatcher {
    api: Arc<dyn RedditApi>,
    executor: ActionExecutor,
    settings: Arc<dyn SettingsStore>,
}

impl EventDispatcher {
    pub fn new(api: Arc<dyn RedditApi>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            executor: ActionExecutor::new(api.clone()),
            api,
            settings,
        }
    }

    /// Entry point for the host: reads the current settings and handles the
    /// event. Never fails; every problem ends up in the returned outcome.
    pub async fn on_submission_event(&self, event: &TriggerEvent) -> DispatchOutcome {
        let config = match ModerationConfig::from_store(self.settings.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Skipping {} event: {e}", event.event_type);
                return DispatchOutcome::ConfigUnavailable(e);
            }
        };
        self.dispatch(event, &config, Utc::now()).await
    }

    pub async fn dispatch(
        &self,
        event: &TriggerEvent,
        config: &ModerationConfig,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let Some(author) = event.author.as_ref() else {
            log::warn!("Skipping {} event without author", event.event_type);
            return DispatchOutcome::ProfileUnavailable("event has no author".to_string());
        };

        let profile = match self.api.get_user_by_id(&author.id).await {
            Ok(profile) => profile,
            Err(e) => {
                log::warn!("Could not fetch user {} ({}): {e}", author.name, author.id);
                return DispatchOutcome::ProfileUnavailable(e.to_string());
            }
        };

        let submission = match SubmissionEvent::try_from(event) {
            Ok(submission) => submission,
            Err(e) => {
                log::warn!("Ignoring event: {e}");
                return DispatchOutcome::Rejected(e.to_string());
            }
        };

        let kind = submission.item_kind();
        if !scope_matches(config.listener_scope, kind) {
            log::debug!(
                "{kind} {} is outside listener scope {}",
                submission.item_id(),
                config.listener_scope
            );
            return DispatchOutcome::OutOfScope(kind);
        }

        let verdict = classify(&profile, config, now);
        if !verdict.is_spam {
            log::debug!("{} passed: {}", profile.username, verdict.reason);
            return DispatchOutcome::NotSpam(verdict);
        }

        let details = submission.submission();
        let outcome = self
            .executor
            .remove_and_annotate(&details.item_id, &details.subreddit_name, &details.author_name)
            .await;
        if outcome.removed {
            log::info!(
                "Removed {kind} {} by {} in r/{}: {}",
                details.item_id,
                details.author_name,
                details.subreddit_name,
                verdict.reason
            );
        } else {
            log::warn!(
                "Flagged {kind} {} by {} in r/{} but it could not be removed: {}",
                details.item_id,
                details.author_name,
                details.subreddit_name,
                verdict.reason
            );
        }

        DispatchOutcome::Actioned { verdict, outcome }
    }
}
