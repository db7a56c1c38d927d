pub mod actions;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod listener;
pub mod models;
pub mod platform;
pub mod purge;
pub mod settings;

pub use classifier::{classify, SpamVerdict};
pub use config::Config;
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use error::{ConfigError, ModerationError, PlatformError};
pub use event::{resolve_item_id, SubmissionEvent, TriggerEvent};
pub use purge::{PurgeOrchestrator, PurgeReport, PurgeTarget};
pub use settings::{ListenerScope, ModerationConfig};
