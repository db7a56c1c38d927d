use crate::settings::{
    ListenerScope, SettingValue, SettingsStore, AUTH_AGE_KEY, AUTH_KARMA_KEY,
    LISTENER_OBJECT_KEY,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub reddit: RedditConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub listener: ListenerConfig,
    pub logging: Option<LoggingConfig>,
}

/// Credentials of a Reddit "script" app run by a moderator account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    /// Subreddit the listener watches, without the `r/` prefix.
    pub subreddit: String,
    pub timeout_seconds: Option<u64>,
}

/// Moderator-tunable values, keyed like the app's settings form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// "1" posts, "2" comments, "3" both.
    pub listener_object: Option<String>,
    /// Accounts this many months old or newer are checked.
    pub auth_age: Option<i64>,
    /// Accounts with this much comment karma or less are checked.
    pub auth_karma: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub poll_interval_seconds: u64,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl SettingsStore for Settings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        match key {
            LISTENER_OBJECT_KEY => self.listener_object.clone().map(SettingValue::Text),
            AUTH_AGE_KEY => self.auth_age.map(SettingValue::Number),
            AUTH_KARMA_KEY => self.auth_karma.map(SettingValue::Number),
            _ => None,
        }
    }
}

impl Settings {
    /// Same checks the settings form applies before saving.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        match self.listener_object.as_deref() {
            None => problems.push("listener_object is not set".to_string()),
            Some(value) if ListenerScope::parse(value).is_none() => problems.push(format!(
                "listener_object '{value}' must be 1 (posts), 2 (comments) or 3 (both)"
            )),
            Some(_) => {}
        }

        for (name, value) in [("auth_age", self.auth_age), ("auth_karma", self.auth_karma)] {
            match value {
                None => problems.push(format!("{name} is not set")),
                Some(v) if v <= 0 => {
                    problems.push(format!("{name}: Please enter an amount over 0"))
                }
                Some(_) => {}
            }
        }

        problems
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 30,
            batch_size: 25,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reddit: RedditConfig {
                client_id: "CLIENT_ID".to_string(),
                client_secret: "CLIENT_SECRET".to_string(),
                username: "moderator-account".to_string(),
                password: "PASSWORD".to_string(),
                user_agent: format!("spam-buster/{}", env!("CARGO_PKG_VERSION")),
                subreddit: "mysubreddit".to_string(),
                timeout_seconds: Some(30),
            },
            settings: Settings {
                listener_object: Some(ListenerScope::Both.option_value().to_string()),
                auth_age: Some(6),
                auth_karma: Some(5),
            },
            listener: ListenerConfig::default(),
            logging: Some(LoggingConfig {
                level: "info".to_string(),
            }),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut problems = self.settings.validate();
        if self.reddit.subreddit.trim().is_empty() {
            problems.push("reddit.subreddit is empty".to_string());
        }
        if self.listener.poll_interval_seconds == 0 {
            problems.push("listener.poll_interval_seconds must be over 0".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ModerationConfig;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.settings.listener_object.as_deref(), Some("3"));
        assert_eq!(
            ModerationConfig::from_store(&config.settings)
                .unwrap()
                .listener_scope,
            ListenerScope::Both
        );
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spam-buster.yaml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.settings.listener_object = Some("1".to_string());
        config.to_file(path).unwrap();

        let loaded = Config::from_file(path).unwrap();
        assert_eq!(loaded.settings, config.settings);
        assert_eq!(loaded.reddit.subreddit, "mysubreddit");
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
reddit:
  client_id: abc
  client_secret: def
  username: modbot
  password: hunter2
  user_agent: spam-buster/test
  subreddit: rust
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.listener.poll_interval_seconds, 30);
        assert_eq!(config.settings, Settings::default());
        assert!(config.logging.is_none());

        // nothing configured yet: the core refuses to act
        assert!(ModerationConfig::from_store(&config.settings).is_err());
        assert_eq!(config.validate().len(), 3);
    }

    #[test]
    fn test_settings_feed_moderation_config() {
        let settings = Settings {
            listener_object: Some("2".to_string()),
            auth_age: Some(12),
            auth_karma: Some(50),
        };

        let config = ModerationConfig::from_store(&settings).unwrap();
        assert_eq!(config.listener_scope, ListenerScope::Comments);
        assert_eq!(config.max_account_age_months, 12);
        assert_eq!(config.max_comment_karma, 50);
    }

    #[test]
    fn test_non_positive_thresholds_rejected() {
        let settings = Settings {
            listener_object: Some("9".to_string()),
            auth_age: Some(0),
            auth_karma: Some(-1),
        };

        let problems = settings.validate();
        assert_eq!(problems.len(), 3);
        assert!(problems[1].contains("Please enter an amount over 0"));
    }
}
