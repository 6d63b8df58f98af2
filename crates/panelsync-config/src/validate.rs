//! Configuration validation logic.

use std::collections::HashSet;

use crate::Config;
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.servers.is_empty() {
        return Err(ConfigError::Validation("servers is empty".into()));
    }
    let mut names = HashSet::new();
    for server in &config.servers {
        if server.name.trim().is_empty() {
            return Err(ConfigError::Validation("servers[].name is empty".into()));
        }
        if !names.insert(server.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate server name: {}",
                server.name
            )));
        }
        if !server.address.starts_with("http://") && !server.address.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "servers.{}.address must start with http:// or https://",
                server.name
            )));
        }
        if server.inbounds.is_empty() {
            return Err(ConfigError::Validation(format!(
                "servers.{}.inbounds is empty",
                server.name
            )));
        }
        let (username, password) = server.credentials(&config.panel);
        if username.is_empty() || password.is_empty() {
            return Err(ConfigError::Validation(format!(
                "no panel credentials for server {} (set panel.username/password or override per server)",
                server.name
            )));
        }
    }
    if config.sync.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "sync.interval_secs must be > 0".into(),
        ));
    }
    if config.sync.concurrency == 0 {
        return Err(ConfigError::Validation(
            "sync.concurrency must be > 0".into(),
        ));
    }
    if !(1..=100).contains(&config.sync.warning_threshold_percent) {
        return Err(ConfigError::Validation(
            "sync.warning_threshold_percent must be 1..=100".into(),
        ));
    }
    if config.panel.call_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "panel.call_timeout_secs must be > 0".into(),
        ));
    }
    if !config.policy.total_gb.is_finite() || config.policy.total_gb < 0.0 {
        return Err(ConfigError::Validation(
            "policy.total_gb must be >= 0".into(),
        ));
    }
    if config.policy.duration_days == 0 {
        return Err(ConfigError::Validation(
            "policy.duration_days must be > 0".into(),
        ));
    }
    if config.subscription.dir.trim().is_empty() {
        return Err(ConfigError::Validation("subscription.dir is empty".into()));
    }
    if config.registry.path.trim().is_empty() {
        return Err(ConfigError::Validation("registry.path is empty".into()));
    }
    if let Some(ref url) = config.notify.webhook_url
        && !url.starts_with("http://")
        && !url.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "notify.webhook_url must be an http(s) URL".into(),
        ));
    }
    Ok(())
}
