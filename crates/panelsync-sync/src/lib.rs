//! Reconciliation loop for panelsync.
//!
//! Each pass loads the account registry, opens one session per configured
//! server and then, per user with bounded concurrency:
//!
//! 1. provisions the user's client on every (server, inbound) pair,
//! 2. aggregates traffic into a [`QuotaSummary`],
//! 3. rebuilds connection links and publishes the subscription artifact,
//! 4. runs the quota-warning state machine and persists its flag.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use panelsync_sync::{HttpConnector, LogNotifier, Orchestrator, YamlRegistry};
//!
//! # async fn example(config: panelsync_config::Config) -> Result<(), panelsync_sync::SyncError> {
//! let orchestrator = Orchestrator::new(
//!     config.clone(),
//!     Arc::new(HttpConnector::new(config.panel.clone())),
//!     Arc::new(YamlRegistry::new(&config.registry.path)),
//!     Arc::new(LogNotifier),
//! );
//! let report = orchestrator.run_pass().await?;
//! println!("published {} artifacts", report.published);
//! # Ok(())
//! # }
//! ```

pub mod cli;
mod connector;
mod error;
mod notify;
mod orchestrator;
mod pipeline;
mod provision;
mod publish;
mod quota;
mod registry;
mod reset;
mod warning;

pub use cli::SyncArgs;
pub use connector::{
    HttpConnector, PanelConnector, Session, SharedPanel, StaticConnector, connect_all,
};
pub use error::{NotifyError, PublishError, RegistryError, SyncError};
pub use notify::{LogNotifier, Notification, Notifier, RecordingNotifier, WebhookNotifier};
pub use orchestrator::{Orchestrator, PassReport};
pub use pipeline::{PassContext, UserReport, sync_user};
pub use provision::{ClientPolicy, Provisioned, ensure_client, new_client};
pub use publish::{PublishOutcome, Publisher, encode};
pub use quota::{QuotaAggregator, QuotaSummary};
pub use registry::{AccountRegistry, MemoryRegistry, UserAccount, YamlRegistry};
pub use reset::next_reset;
pub use warning::{Transition, WarningPolicy, WarningState};
