//! Core constants shared across panelsync crates.
//!
//! This crate provides:
//! - Default configuration values
//! - Error kind labels for metrics/logging
//! - Byte and time unit helpers

pub mod defaults;
pub mod errors;
pub mod units;

// Re-export commonly used items at crate root
pub use defaults::*;
pub use errors::*;
pub use units::*;

/// Project name.
pub const PROJECT_NAME: &str = "panelsync";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `User-Agent` sent to panels and webhooks.
pub fn user_agent() -> String {
    format!("{PROJECT_NAME}/{VERSION}")
}
