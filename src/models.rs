use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a piece of user content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Comment,
}

impl ItemKind {
    /// Reddit fullname prefix for this kind of thing.
    pub fn fullname_prefix(&self) -> &'static str {
        match self {
            ItemKind::Post => "t3_",
            ItemKind::Comment => "t1_",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Post => write!(f, "post"),
            ItemKind::Comment => write!(f, "comment"),
        }
    }
}

/// Snapshot of an account, fetched fresh for every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub comment_karma: i64,
}

/// Read-only view of a post or comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub kind: ItemKind,
    pub author_name: String,
    pub subreddit_id: String,
    pub subreddit_name: String,
}

/// Annotation appended to the subreddit's moderation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModNote {
    pub label: String,
    pub subreddit: String,
    pub note: String,
    pub user: String,
    pub reddit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRequest {
    pub subreddit_name: String,
    pub username: String,
    /// Fullname of the item the ban was issued from.
    pub context: String,
    pub reason: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
}
