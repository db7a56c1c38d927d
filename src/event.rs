//! Submission events delivered by the host platform.
//!
//! The host hands over a loosely typed [`TriggerEvent`]; the pipeline only
//! ever works on the closed [`SubmissionEvent`] produced from it.

use crate::error::ModerationError;
use crate::models::ItemKind;
use serde::{Deserialize, Serialize};

pub const POST_SUBMIT: &str = "PostSubmit";
pub const COMMENT_SUBMIT: &str = "CommentSubmit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubredditRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingRef {
    pub id: String,
}

/// Raw trigger payload as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub author: Option<AuthorRef>,
    #[serde(default)]
    pub subreddit: Option<SubredditRef>,
    #[serde(default)]
    pub post: Option<ThingRef>,
    #[serde(default)]
    pub comment: Option<ThingRef>,
}

impl TriggerEvent {
    pub fn post_submit(author: AuthorRef, subreddit: SubredditRef, post_id: &str) -> Self {
        Self {
            event_type: POST_SUBMIT.to_string(),
            author: Some(author),
            subreddit: Some(subreddit),
            post: Some(ThingRef {
                id: post_id.to_string(),
            }),
            comment: None,
        }
    }

    pub fn comment_submit(author: AuthorRef, subreddit: SubredditRef, comment_id: &str) -> Self {
        Self {
            event_type: COMMENT_SUBMIT.to_string(),
            author: Some(author),
            subreddit: Some(subreddit),
            post: None,
            comment: Some(ThingRef {
                id: comment_id.to_string(),
            }),
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Fields shared by both submission kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub author_id: String,
    pub author_name: String,
    pub subreddit_id: String,
    pub subreddit_name: String,
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    PostSubmit(Submission),
    CommentSubmit(Submission),
}

impl SubmissionEvent {
    pub fn submission(&self) -> &Submission {
        match self {
            SubmissionEvent::PostSubmit(s) | SubmissionEvent::CommentSubmit(s) => s,
        }
    }

    pub fn item_kind(&self) -> ItemKind {
        match self {
            SubmissionEvent::PostSubmit(_) => ItemKind::Post,
            SubmissionEvent::CommentSubmit(_) => ItemKind::Comment,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.submission().item_id
    }
}

impl TryFrom<&TriggerEvent> for SubmissionEvent {
    type Error = ModerationError;

    fn try_from(event: &TriggerEvent) -> Result<Self, Self::Error> {
        let item_id = resolve_item_id(event)?;
        let author = event.author.as_ref().ok_or_else(|| {
            ModerationError::UnknownEventKind(format!("{} without author", event.event_type))
        })?;
        let subreddit = event.subreddit.as_ref().ok_or_else(|| {
            ModerationError::UnknownEventKind(format!("{} without subreddit", event.event_type))
        })?;

        let submission = Submission {
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            subreddit_id: subreddit.id.clone(),
            subreddit_name: subreddit.name.clone(),
            item_id,
        };

        // resolve_item_id already rejected every other tag
        if event.event_type == POST_SUBMIT {
            Ok(SubmissionEvent::PostSubmit(submission))
        } else {
            Ok(SubmissionEvent::CommentSubmit(submission))
        }
    }
}

/// Canonical item id for a trigger event.
///
/// Fails for any event type other than `PostSubmit`/`CommentSubmit`, and for
/// either of those when the matching item payload is absent.
pub fn resolve_item_id(event: &TriggerEvent) -> Result<String, ModerationError> {
    let item = match event.event_type.as_str() {
        POST_SUBMIT => event.post.as_ref(),
        COMMENT_SUBMIT => event.comment.as_ref(),
        other => return Err(ModerationError::UnknownEventKind(other.to_string())),
    };

    item.map(|thing| thing.id.clone()).ok_or_else(|| {
        ModerationError::UnknownEventKind(format!("{} without item", event.event_type))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> AuthorRef {
        AuthorRef {
            id: "t2_abc".to_string(),
            name: "spammy".to_string(),
        }
    }

    fn subreddit() -> SubredditRef {
        SubredditRef {
            id: "t5_sub".to_string(),
            name: "rust".to_string(),
        }
    }

    #[test]
    fn test_resolve_post_id() {
        let event = TriggerEvent::post_submit(author(), subreddit(), "t3_post");
        assert_eq!(resolve_item_id(&event).unwrap(), "t3_post");
    }

    #[test]
    fn test_resolve_comment_id() {
        let mut event = TriggerEvent::comment_submit(author(), subreddit(), "t1_comment");
        // a stray post ref must not win over the comment
        event.post = Some(ThingRef {
            id: "t3_parent".to_string(),
        });
        assert_eq!(resolve_item_id(&event).unwrap(), "t1_comment");
    }

    #[test]
    fn test_resolve_unknown_kind_fails() {
        let mut event = TriggerEvent::post_submit(author(), subreddit(), "t3_post");
        event.event_type = "PostDelete".to_string();

        match resolve_item_id(&event) {
            Err(ModerationError::UnknownEventKind(kind)) => assert_eq!(kind, "PostDelete"),
            other => panic!("expected UnknownEventKind, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_missing_payload_fails() {
        let mut event = TriggerEvent::comment_submit(author(), subreddit(), "t1_comment");
        event.comment = None;
        assert!(matches!(
            resolve_item_id(&event),
            Err(ModerationError::UnknownEventKind(_))
        ));
    }

    #[test]
    fn test_submission_event_from_json() {
        let json = r#"{
            "type": "CommentSubmit",
            "author": {"id": "t2_abc", "name": "spammy"},
            "subreddit": {"id": "t5_sub", "name": "rust"},
            "comment": {"id": "t1_xyz"}
        }"#;
        let raw = TriggerEvent::from_json(json).unwrap();
        let event = SubmissionEvent::try_from(&raw).unwrap();

        assert_eq!(event.item_kind(), ItemKind::Comment);
        assert_eq!(event.item_id(), "t1_xyz");
        assert_eq!(event.submission().author_name, "spammy");
        assert_eq!(event.submission().subreddit_name, "rust");
    }

    #[test]
    fn test_submission_event_requires_author() {
        let mut raw = TriggerEvent::post_submit(author(), subreddit(), "t3_post");
        raw.author = None;
        assert!(SubmissionEvent::try_from(&raw).is_err());
    }
}
