//! Moderator-facing settings and the typed view the pipeline reads them into.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const LISTENER_OBJECT_KEY: &str = "listenerObject";
pub const AUTH_AGE_KEY: &str = "authAge";
pub const AUTH_KARMA_KEY: &str = "authKarma";

/// Which submission kinds trigger automatic classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListenerScope {
    Posts,
    Comments,
    Both,
}

impl ListenerScope {
    /// Parses the value stored by the settings form ("1", "2" or "3").
    /// Scope names are accepted as well.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "1" | "posts" => Some(ListenerScope::Posts),
            "2" | "comments" => Some(ListenerScope::Comments),
            "3" | "both" => Some(ListenerScope::Both),
            _ => None,
        }
    }

    /// The value stored under `listenerObject` for this scope.
    pub fn option_value(&self) -> &'static str {
        match self {
            ListenerScope::Posts => "1",
            ListenerScope::Comments => "2",
            ListenerScope::Both => "3",
        }
    }
}

impl fmt::Display for ListenerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerScope::Posts => write!(f, "Posts"),
            ListenerScope::Comments => write!(f, "Comments"),
            ListenerScope::Both => write!(f, "Posts and comments"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Number(i64),
    Text(String),
}

impl SettingValue {
    fn as_text(&self) -> String {
        match self {
            SettingValue::Number(n) => n.to_string(),
            SettingValue::Text(s) => s.clone(),
        }
    }

    fn as_number(&self) -> Option<i64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            SettingValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Key/value access to persisted app settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<SettingValue>;
}

impl SettingsStore for HashMap<String, SettingValue> {
    fn get(&self, key: &str) -> Option<SettingValue> {
        HashMap::get(self, key).cloned()
    }
}

/// Thresholds and scope for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub listener_scope: ListenerScope,
    pub max_account_age_months: u32,
    pub max_comment_karma: u32,
}

impl ModerationConfig {
    /// Reads the three moderation settings. Any missing or unreadable value
    /// is an error so callers can skip the event instead of guessing.
    pub fn from_store(store: &dyn SettingsStore) -> Result<Self, ConfigError> {
        let scope_value = store
            .get(LISTENER_OBJECT_KEY)
            .ok_or(ConfigError::Missing(LISTENER_OBJECT_KEY))?
            .as_text();
        let listener_scope =
            ListenerScope::parse(&scope_value).ok_or_else(|| ConfigError::Invalid {
                key: LISTENER_OBJECT_KEY,
                value: scope_value.clone(),
            })?;

        Ok(Self {
            listener_scope,
            max_account_age_months: read_threshold(store, AUTH_AGE_KEY)?,
            max_comment_karma: read_threshold(store, AUTH_KARMA_KEY)?,
        })
    }
}

fn read_threshold(store: &dyn SettingsStore, key: &'static str) -> Result<u32, ConfigError> {
    let value = store.get(key).ok_or(ConfigError::Missing(key))?;
    value
        .as_number()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: value.as_text(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entries: &[(&str, SettingValue)]) -> HashMap<String, SettingValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(ListenerScope::parse("1"), Some(ListenerScope::Posts));
        assert_eq!(ListenerScope::parse("2"), Some(ListenerScope::Comments));
        assert_eq!(ListenerScope::parse("3"), Some(ListenerScope::Both));
        assert_eq!(ListenerScope::parse("Both"), Some(ListenerScope::Both));
        assert_eq!(ListenerScope::parse("4"), None);
    }

    #[test]
    fn test_from_store() {
        let settings = store(&[
            (LISTENER_OBJECT_KEY, SettingValue::Text("2".to_string())),
            (AUTH_AGE_KEY, SettingValue::Number(6)),
            (AUTH_KARMA_KEY, SettingValue::Text("5".to_string())),
        ]);

        let config = ModerationConfig::from_store(&settings).unwrap();
        assert_eq!(config.listener_scope, ListenerScope::Comments);
        assert_eq!(config.max_account_age_months, 6);
        assert_eq!(config.max_comment_karma, 5);
    }

    #[test]
    fn test_missing_setting_fails_closed() {
        let settings = store(&[
            (LISTENER_OBJECT_KEY, SettingValue::Text("3".to_string())),
            (AUTH_AGE_KEY, SettingValue::Number(6)),
        ]);

        assert_eq!(
            ModerationConfig::from_store(&settings),
            Err(ConfigError::Missing(AUTH_KARMA_KEY))
        );
    }

    #[test]
    fn test_garbage_threshold_is_invalid() {
        let settings = store(&[
            (LISTENER_OBJECT_KEY, SettingValue::Text("3".to_string())),
            (AUTH_AGE_KEY, SettingValue::Number(-2)),
            (AUTH_KARMA_KEY, SettingValue::Number(5)),
        ]);

        assert!(matches!(
            ModerationConfig::from_store(&settings),
            Err(ConfigError::Invalid { key: AUTH_AGE_KEY, .. })
        ));
    }
}
