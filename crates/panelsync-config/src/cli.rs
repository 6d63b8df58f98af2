//! CLI override definitions and application logic.

use clap::Parser;

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override sleep between passes (seconds)
    #[arg(long)]
    pub interval_secs: Option<u64>,
    /// Override number of users reconciled concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Override quota warning threshold (percent)
    #[arg(long)]
    pub warning_threshold: Option<u8>,
    /// Override shared panel username
    #[arg(long, env = "PANELSYNC_PANEL_USERNAME")]
    pub panel_username: Option<String>,
    /// Override shared panel password
    #[arg(long, env = "PANELSYNC_PANEL_PASSWORD", hide_env_values = true)]
    pub panel_password: Option<String>,
    /// Override subscription artifact directory
    #[arg(long)]
    pub subscription_dir: Option<String>,
    /// Override account registry path
    #[arg(long)]
    pub registry: Option<String>,
    /// Override notification webhook URL
    #[arg(long)]
    pub webhook_url: Option<String>,
    /// Override metrics listen address
    #[arg(long)]
    pub metrics_listen: Option<String>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = overrides.interval_secs {
        config.sync.interval_secs = v;
    }
    if let Some(v) = overrides.concurrency {
        config.sync.concurrency = v;
    }
    if let Some(v) = overrides.warning_threshold {
        config.sync.warning_threshold_percent = v;
    }
    if let Some(v) = &overrides.panel_username {
        config.panel.username = v.clone();
    }
    if let Some(v) = &overrides.panel_password {
        config.panel.password = v.clone();
    }
    if let Some(v) = &overrides.subscription_dir {
        config.subscription.dir = v.clone();
    }
    if let Some(v) = &overrides.registry {
        config.registry.path = v.clone();
    }
    if let Some(v) = &overrides.webhook_url {
        config.notify.webhook_url = Some(v.clone());
    }
    if let Some(v) = &overrides.metrics_listen {
        config.metrics.listen = Some(v.clone());
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
}
