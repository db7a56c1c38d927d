use thiserror::Error;

/// Failures raised by the content platform client.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("{0}")]
    Injected(String),
}

/// Errors surfaced by the moderation pipeline.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),
    #[error("Cannot find a {location} with ID {id}")]
    ItemNotFound { location: String, id: String },
    #[error("{action} failed: {source}")]
    UpstreamActionFailure {
        action: &'static str,
        #[source]
        source: PlatformError,
    },
}

impl ModerationError {
    pub fn upstream(action: &'static str, source: PlatformError) -> Self {
        ModerationError::UpstreamActionFailure { action, source }
    }
}

/// Problems reading moderation settings from the settings store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Setting '{0}' is not set")]
    Missing(&'static str),
    #[error("Setting '{key}' has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}
