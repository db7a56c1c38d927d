//! Reddit OAuth client for script apps.

use super::RedditApi;
use crate::config::RedditConfig;
use crate::error::PlatformError;
use crate::event::{AuthorRef, SubredditRef, TriggerEvent};
use crate::models::{BanRequest, ContentItem, CurrentUser, ItemKind, ModNote, UserProfile};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com/";
/// Largest page Reddit serves for a listing.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Thing>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: ThingData,
}

#[derive(Debug, Deserialize)]
struct ThingData {
    name: String,
    author: String,
    #[serde(default)]
    author_fullname: Option<String>,
    subreddit_id: String,
    subreddit: String,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    name: String,
    created_utc: f64,
    #[serde(default)]
    comment_karma: i64,
}

#[derive(Debug, Deserialize)]
struct Me {
    name: String,
}

impl Thing {
    fn kind(&self) -> Option<ItemKind> {
        match self.kind.as_str() {
            "t3" => Some(ItemKind::Post),
            "t1" => Some(ItemKind::Comment),
            _ => None,
        }
    }

    fn into_item(self) -> Option<ContentItem> {
        let kind = self.kind()?;
        Some(ContentItem {
            id: self.data.name,
            kind,
            author_name: self.data.author,
            subreddit_id: self.data.subreddit_id,
            subreddit_name: self.data.subreddit,
        })
    }

    /// Builds the trigger event the host would deliver for this submission.
    /// Deleted authors have no fullname and produce nothing.
    fn into_trigger(self) -> Option<TriggerEvent> {
        let kind = self.kind()?;
        let author = AuthorRef {
            id: self.data.author_fullname?,
            name: self.data.author,
        };
        let subreddit = SubredditRef {
            id: self.data.subreddit_id,
            name: self.data.subreddit,
        };
        Some(match kind {
            ItemKind::Post => TriggerEvent::post_submit(author, subreddit, &self.data.name),
            ItemKind::Comment => TriggerEvent::comment_submit(author, subreddit, &self.data.name),
        })
    }
}

pub struct RedditClient {
    client: Client,
    config: RedditConfig,
    api_base: Url,
    token: RwLock<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(config: RedditConfig) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.unwrap_or(30)))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            config,
            api_base: Url::parse(API_BASE)?,
            token: RwLock::new(None),
        })
    }

    pub fn subreddit(&self) -> &str {
        &self.config.subreddit
    }

    /// Bearer token, fetched with the password grant and cached until shortly
    /// before it expires.
    async fn access_token(&self) -> Result<String, PlatformError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() {
                    return Ok(token.value.clone());
                }
            }
        }

        log::debug!("Requesting Reddit access token for {}", self.config.username);
        let response = self
            .client
            .post(AUTH_URL)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?;
        let body: TokenResponse = decode(check_status(response).await?).await?;

        let value = match (body.access_token, body.error) {
            (Some(token), _) => token,
            (None, Some(error)) => return Err(PlatformError::Auth(error)),
            (None, None) => return Err(PlatformError::Auth("no access token".to_string())),
        };
        // refresh a minute early
        let lifetime = body.expires_in.unwrap_or(3600).saturating_sub(60);
        let token = AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        };
        *self.token.write().await = Some(token);

        Ok(value)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let url = self.api_base.join(path)?;
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("raw_json", "1")])
            .query(query)
            .send()
            .await?;
        decode(check_status(response).await?).await
    }

    async fn post(&self, path: &str, form: &[(&str, String)]) -> Result<(), PlatformError> {
        let url = self.api_base.join(path)?;
        let token = self.access_token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .form(form)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn get_thing(&self, id: &str, kind: ItemKind) -> Result<ContentItem, PlatformError> {
        let fullname = if id.starts_with(kind.fullname_prefix()) {
            id.to_string()
        } else {
            format!("{}{}", kind.fullname_prefix(), id)
        };

        let listing: Listing = self.get("api/info", &[("id", fullname.clone())]).await?;
        listing
            .data
            .children
            .into_iter()
            .filter_map(Thing::into_item)
            .find(|item| item.kind == kind)
            .ok_or(PlatformError::NotFound(fullname))
    }

    /// Newest posts or comments of `subreddit` as trigger events, newest first.
    pub async fn latest_submissions(
        &self,
        subreddit: &str,
        kind: ItemKind,
        limit: usize,
    ) -> Result<Vec<TriggerEvent>, PlatformError> {
        let path = match kind {
            ItemKind::Post => format!("r/{subreddit}/new"),
            ItemKind::Comment => format!("r/{subreddit}/comments"),
        };
        let listing: Listing = self
            .get(&path, &[("limit", limit.min(MAX_PAGE_SIZE).to_string())])
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter_map(Thing::into_trigger)
            .collect())
    }
}

async fn check_status(response: Response) -> Result<Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(PlatformError::NotFound(body));
    }
    Err(PlatformError::Api {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PlatformError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| PlatformError::Decode(e.to_string()))
}

#[async_trait]
impl RedditApi for RedditClient {
    async fn get_user_by_id(&self, id: &str) -> Result<UserProfile, PlatformError> {
        let accounts: HashMap<String, AccountData> = self
            .get("api/user_data_by_account_ids", &[("ids", id.to_string())])
            .await?;
        let account = accounts
            .get(id)
            .ok_or_else(|| PlatformError::NotFound(format!("user {id}")))?;

        let created_at = Utc
            .timestamp_opt(account.created_utc as i64, 0)
            .single()
            .ok_or_else(|| {
                PlatformError::Decode(format!("bad created_utc {}", account.created_utc))
            })?;

        Ok(UserProfile {
            id: id.to_string(),
            username: account.name.clone(),
            created_at,
            comment_karma: account.comment_karma,
        })
    }

    async fn get_post_by_id(&self, id: &str) -> Result<ContentItem, PlatformError> {
        self.get_thing(id, ItemKind::Post).await
    }

    async fn get_comment_by_id(&self, id: &str) -> Result<ContentItem, PlatformError> {
        self.get_thing(id, ItemKind::Comment).await
    }

    async fn get_comments_and_posts_by_user(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<ContentItem>, PlatformError> {
        let path = format!("user/{username}/overview");
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        while items.len() < limit {
            let page_size = (limit - items.len()).min(MAX_PAGE_SIZE);
            let mut query = vec![("limit", page_size.to_string())];
            if let Some(cursor) = after.take() {
                query.push(("after", cursor));
            }

            let listing: Listing = self.get(&path, &query).await?;
            let fetched = listing.data.children.len();
            items.extend(listing.data.children.into_iter().filter_map(Thing::into_item));

            match listing.data.after {
                Some(cursor) if fetched > 0 => after = Some(cursor),
                _ => break,
            }
        }

        items.truncate(limit);
        Ok(items)
    }

    async fn remove(&self, id: &str, is_spam: bool) -> Result<(), PlatformError> {
        self.post(
            "api/remove",
            &[("id", id.to_string()), ("spam", is_spam.to_string())],
        )
        .await
    }

    async fn add_mod_note(&self, note: &ModNote) -> Result<(), PlatformError> {
        self.post(
            "api/mod/notes",
            &[
                ("subreddit", note.subreddit.clone()),
                ("user", note.user.clone()),
                ("note", note.note.clone()),
                ("label", note.label.clone()),
                ("reddit_id", note.reddit_id.clone()),
            ],
        )
        .await
    }

    async fn ban_user(&self, ban: &BanRequest) -> Result<(), PlatformError> {
        self.post(
            &format!("r/{}/api/friend", ban.subreddit_name),
            &[
                ("api_type", "json".to_string()),
                ("type", "banned".to_string()),
                ("name", ban.username.clone()),
                ("ban_reason", ban.reason.clone()),
                ("note", ban.note.clone()),
                ("ban_context", ban.context.clone()),
            ],
        )
        .await
    }

    async fn get_current_user(&self) -> Result<CurrentUser, PlatformError> {
        let me: Me = self.get("api/v1/me", &[]).await?;
        Ok(CurrentUser { username: me.name })
    }
}
