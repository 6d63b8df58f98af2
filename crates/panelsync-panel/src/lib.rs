//! 3X-UI panel client for panelsync.
//!
//! This crate provides the [`PanelApi`] trait with an HTTP implementation
//! ([`HttpPanel`]) and an in-memory one ([`MemoryPanel`]), plus the typed
//! inbound model everything downstream works with.
//!
//! # Example
//!
//! ```
//! use panelsync_panel::{ClientIdentity, MemoryPanel, PanelApi};
//!
//! # async fn example() -> Result<(), panelsync_panel::PanelError> {
//! let panel = MemoryPanel::new();
//! let sample = panel.get_traffic(&ClientIdentity::new("42", 1)).await?;
//! assert!(sample.is_none());
//! # Ok(())
//! # }
//! ```

pub mod cli;
mod error;
mod http;
mod memory;
mod model;
mod traits;
mod wire;

pub use cli::ClientArgs;
pub use error::PanelError;
pub use http::HttpPanel;
pub use memory::MemoryPanel;
pub use model::{
    ClientIdentity, ClientRecord, ExternalProxy, InboundConfig, RealitySettings, ResetInterval,
    Security, SecurityKind, StreamSettings, TlsSettings, TrafficSample, Transport, TransportKind,
};
pub use traits::PanelApi;
