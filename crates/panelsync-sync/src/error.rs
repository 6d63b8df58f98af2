//! Sync error types.

use panelsync_config::ConfigError;
use panelsync_core::errors;
use panelsync_panel::PanelError;

/// Subscription artifact write failure.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("invalid subscription token: {0:?}")]
    InvalidToken(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Account registry failure.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown user: {0}")]
    UnknownUser(String),
}

/// Notification delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook answered {0}")]
    Status(u16),

    #[error("notifier closed")]
    Closed,
}

/// Top-level sync error.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("panel: {0}")]
    Panel(#[from] PanelError),

    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("publish: {0}")]
    Publish(#[from] PublishError),

    #[error("notify: {0}")]
    Notify(#[from] NotifyError),

    #[error("metrics: {0}")]
    Metrics(String),

    #[error("worker failed: {0}")]
    Worker(String),
}

impl SyncError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => errors::ERROR_CONFIG,
            Self::Panel(e) => e.kind(),
            Self::Registry(_) => errors::ERROR_REGISTRY,
            Self::Publish(_) => errors::ERROR_PUBLISH,
            Self::Notify(_) => errors::ERROR_NOTIFY,
            Self::Metrics(_) | Self::Worker(_) => errors::ERROR_INTERNAL,
        }
    }
}
