//! # panelsync
//!
//! Periodic reconciler for 3X-UI proxy panels: aggregates per-user traffic
//! across servers, provisions missing clients, rebuilds connection links and
//! publishes base64 subscription files.
//!
//! ## Crates
//!
//! - [`panelsync_core`] - Shared defaults, units and error labels
//! - [`panelsync_config`] - Configuration loading and validation
//! - [`panelsync_panel`] - 3X-UI panel client
//! - [`panelsync_link`] - Connection link reconstruction
//! - [`panelsync_metrics`] - Prometheus-compatible metrics
//! - [`panelsync_sync`] - Reconciliation loop

pub use panelsync_config as config;
pub use panelsync_core as core;
pub use panelsync_link as link;
pub use panelsync_metrics as metrics;
pub use panelsync_panel as panel;
pub use panelsync_sync as sync;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use panelsync_config::{Config, load_config, validate_config};
    pub use panelsync_link::{build_link, status_link};
    pub use panelsync_panel::{HttpPanel, MemoryPanel, PanelApi, PanelError};
    pub use panelsync_sync::{
        AccountRegistry, Orchestrator, PassReport, SyncError, YamlRegistry,
    };
}
