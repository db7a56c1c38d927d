//! Polling event source: watches a subreddit for new posts and comments and
//! feeds each unseen one to the dispatcher as its own task.

use crate::dispatcher::{DispatchOutcome, EventDispatcher};
use crate::error::PlatformError;
use crate::event::{resolve_item_id, TriggerEvent};
use crate::models::ItemKind;
use crate::platform::reddit::RedditClient;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// How many ids are remembered to avoid dispatching an item twice.
const SEEN_CAPACITY: usize = 2048;

#[async_trait]
pub trait SubmissionSource: Send + Sync {
    /// Newest submissions of one kind, newest first.
    async fn latest(
        &self,
        kind: ItemKind,
        limit: usize,
    ) -> Result<Vec<TriggerEvent>, PlatformError>;
}

#[async_trait]
impl SubmissionSource for RedditClient {
    async fn latest(
        &self,
        kind: ItemKind,
        limit: usize,
    ) -> Result<Vec<TriggerEvent>, PlatformError> {
        self.latest_submissions(self.subreddit(), kind, limit).await
    }
}

#[derive(Default)]
struct SeenIds {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenIds {
    /// Returns true when the id was not seen before.
    fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        if self.order.len() > SEEN_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }
}

pub struct Listener {
    source: Arc<dyn SubmissionSource>,
    dispatcher: EventDispatcher,
    poll_interval: Duration,
    batch_size: usize,
    seen: SeenIds,
    /// Kinds whose existing backlog has been recorded.
    primed: HashSet<ItemKind>,
}

impl Listener {
    pub fn new(
        source: Arc<dyn SubmissionSource>,
        dispatcher: EventDispatcher,
        poll_interval: Duration,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            dispatcher,
            poll_interval,
            batch_size,
            seen: SeenIds::default(),
            primed: HashSet::new(),
        }
    }

    /// Fetches both kinds once and dispatches everything not seen before.
    /// The first successful fetch of a kind only records what already exists.
    pub async fn poll_once(&mut self) -> Vec<DispatchOutcome> {
        let mut fresh = Vec::new();
        for kind in [ItemKind::Post, ItemKind::Comment] {
            let events = match self.source.latest(kind, self.batch_size).await {
                Ok(events) => events,
                Err(e) => {
                    log::warn!("Failed to fetch new {kind}s: {e}");
                    continue;
                }
            };

            let priming = self.primed.insert(kind);
            let mut recorded = 0;
            // oldest first so moderators see removals in submission order
            for event in events.into_iter().rev() {
                let Ok(id) = resolve_item_id(&event) else {
                    continue;
                };
                if !self.seen.insert(&id) {
                    continue;
                }
                if priming {
                    recorded += 1;
                } else {
                    fresh.push(event);
                }
            }
            if priming {
                log::info!("Listener primed with {recorded} existing {kind}s");
            }
        }

        let mut tasks = JoinSet::new();
        for event in fresh {
            let dispatcher = self.dispatcher.clone();
            tasks.spawn(async move { dispatcher.on_submission_event(&event).await });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => log::error!("Dispatch task failed: {e}"),
            }
        }
        outcomes
    }

    /// Polls until `shutdown` resolves.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future,
    {
        log::info!(
            "Watching for new submissions every {}s",
            self.poll_interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutting down listener");
                    break;
                }
                _ = ticker.tick() => {
                    let outcomes = self.poll_once().await;
                    if !outcomes.is_empty() {
                        log::debug!("Dispatched {} new submissions", outcomes.len());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AuthorRef, SubredditRef};
    use crate::models::UserProfile;
    use crate::platform::memory::MemoryPlatform;
    use crate::settings::{SettingValue, AUTH_AGE_KEY, AUTH_KARMA_KEY, LISTENER_OBJECT_KEY};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        posts: Mutex<Vec<TriggerEvent>>,
        comments: Mutex<Vec<TriggerEvent>>,
        failing: Mutex<HashSet<ItemKind>>,
    }

    impl FakeSource {
        fn push(&self, event: TriggerEvent) {
            let target = if event.post.is_some() {
                &self.posts
            } else {
                &self.comments
            };
            // newest first, like the listing endpoints
            target.lock().unwrap().insert(0, event);
        }

        fn set_failing(&self, kind: ItemKind, failing: bool) {
            let mut kinds = self.failing.lock().unwrap();
            if failing {
                kinds.insert(kind);
            } else {
                kinds.remove(&kind);
            }
        }
    }

    #[async_trait]
    impl SubmissionSource for FakeSource {
        async fn latest(
            &self,
            kind: ItemKind,
            limit: usize,
        ) -> Result<Vec<TriggerEvent>, PlatformError> {
            if self.failing.lock().unwrap().contains(&kind) {
                return Err(PlatformError::Injected(format!("{kind} listing unavailable")));
            }
            let events = match kind {
                ItemKind::Post => self.posts.lock().unwrap().clone(),
                ItemKind::Comment => self.comments.lock().unwrap().clone(),
            };
            Ok(events.into_iter().take(limit).collect())
        }
    }

    fn author() -> AuthorRef {
        AuthorRef {
            id: "t2_new".to_string(),
            name: "freshspam".to_string(),
        }
    }

    fn subreddit() -> SubredditRef {
        SubredditRef {
            id: "t5_rust".to_string(),
            name: "rust".to_string(),
        }
    }

    fn young_author(platform: &MemoryPlatform) {
        platform.add_user(UserProfile {
            id: "t2_new".to_string(),
            username: "freshspam".to_string(),
            created_at: Utc::now(),
            comment_karma: 1,
        });
    }

    fn listener(source: Arc<FakeSource>, platform: Arc<MemoryPlatform>) -> Listener {
        let mut settings = HashMap::new();
        settings.insert(
            LISTENER_OBJECT_KEY.to_string(),
            SettingValue::Text("3".to_string()),
        );
        settings.insert(AUTH_AGE_KEY.to_string(), SettingValue::Number(6));
        settings.insert(AUTH_KARMA_KEY.to_string(), SettingValue::Number(5));

        let dispatcher = EventDispatcher::new(platform, Arc::new(settings));
        Listener::new(source, dispatcher, Duration::from_secs(30), 25)
    }

    #[test]
    fn test_seen_ids_are_bounded() {
        let mut seen = SeenIds::default();
        assert!(seen.insert("t3_0"));
        assert!(!seen.insert("t3_0"));
        for n in 1..=SEEN_CAPACITY {
            seen.insert(&format!("t3_{n}"));
        }
        assert_eq!(seen.order.len(), SEEN_CAPACITY);
        // the oldest id fell out
        assert!(seen.insert("t3_0"));
    }

    #[tokio::test]
    async fn test_first_poll_only_primes() {
        let source = Arc::new(FakeSource::default());
        let platform = Arc::new(MemoryPlatform::new("mod"));
        source.push(TriggerEvent::post_submit(author(), subreddit(), "t3_old"));
        let mut listener = listener(source.clone(), platform.clone());

        assert!(listener.poll_once().await.is_empty());
        assert!(platform.user_lookups().is_empty());
    }

    #[tokio::test]
    async fn test_new_submissions_are_dispatched_once() {
        let source = Arc::new(FakeSource::default());
        let platform = Arc::new(MemoryPlatform::new("mod"));
        young_author(&platform);
        source.push(TriggerEvent::post_submit(author(), subreddit(), "t3_old"));
        let mut listener = listener(source.clone(), platform.clone());
        listener.poll_once().await;

        source.push(TriggerEvent::post_submit(author(), subreddit(), "t3_new"));
        source.push(TriggerEvent::comment_submit(author(), subreddit(), "t1_new"));

        let outcomes = listener.poll_once().await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, DispatchOutcome::Actioned { .. })));

        let mut removed: Vec<String> = platform.removals().into_iter().map(|(id, _)| id).collect();
        removed.sort();
        assert_eq!(removed, vec!["t1_new", "t3_new"]);

        // nothing new on the next round
        assert!(listener.poll_once().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_first_fetch_does_not_prime() {
        let source = Arc::new(FakeSource::default());
        let platform = Arc::new(MemoryPlatform::new("mod"));
        young_author(&platform);
        source.push(TriggerEvent::post_submit(author(), subreddit(), "t3_existing"));
        source.set_failing(ItemKind::Post, true);
        source.set_failing(ItemKind::Comment, true);
        let mut listener = listener(source.clone(), platform.clone());

        assert!(listener.poll_once().await.is_empty());

        // the listing comes back with the backlog that predates startup
        source.set_failing(ItemKind::Post, false);
        source.set_failing(ItemKind::Comment, false);
        assert!(listener.poll_once().await.is_empty());
        assert!(platform.removals().is_empty());
        assert!(platform.user_lookups().is_empty());

        source.push(TriggerEvent::post_submit(author(), subreddit(), "t3_after"));
        let outcomes = listener.poll_once().await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(platform.removals(), vec![("t3_after".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_kinds_prime_independently() {
        let source = Arc::new(FakeSource::default());
        let platform = Arc::new(MemoryPlatform::new("mod"));
        young_author(&platform);
        source.push(TriggerEvent::post_submit(author(), subreddit(), "t3_old"));
        source.push(TriggerEvent::comment_submit(author(), subreddit(), "t1_old"));
        source.set_failing(ItemKind::Comment, true);
        let mut listener = listener(source.clone(), platform.clone());

        // posts prime now, comments only once their listing succeeds
        assert!(listener.poll_once().await.is_empty());
        source.set_failing(ItemKind::Comment, false);
        source.push(TriggerEvent::post_submit(author(), subreddit(), "t3_new"));

        let outcomes = listener.poll_once().await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(platform.removals(), vec![("t3_new".to_string(), true)]);
    }
}
