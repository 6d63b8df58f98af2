//! Connection URI reconstruction.
//!
//! Turns a typed [`InboundConfig`](panelsync_panel::InboundConfig) plus a
//! client uuid into a `vless://` share link, and renders the status
//! pseudo-link that heads every subscription. Everything here is pure.

mod encode;
pub mod status;
pub mod vless;

pub use status::{QuotaStatus, format_countdown, status_link};
pub use vless::{build_link, resolve_endpoint};
