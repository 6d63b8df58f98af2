//! Configuration loading, validation and CLI overrides for panelsync.
//!
//! A config file describes the panel topology (servers and their inbounds),
//! the shared panel credentials, provisioning policy and where subscription
//! artifacts and the account registry live.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_config};
pub use types::*;
pub use validate::validate_config;
