//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    pub panel: PanelConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Panels to reconcile, in the order their traffic is read.
    pub servers: Vec<ServerTarget>,
}

impl Config {
    /// Find a server by its configured name.
    pub fn server(&self, name: &str) -> Option<&ServerTarget> {
        self.servers.iter().find(|s| s.name == name)
    }
}

/// Reconciliation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Sleep between the end of one pass and the start of the next.
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
    /// Users reconciled concurrently within a pass.
    #[serde(default = "default_sync_concurrency")]
    pub concurrency: usize,
    /// Usage percentage (of quota) that triggers the warning.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_percent: u8,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
            concurrency: default_sync_concurrency(),
            warning_threshold_percent: default_warning_threshold(),
        }
    }
}

/// Shared panel credentials and request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            call_timeout_secs: default_call_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// A single panel and the inbounds reconciled on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerTarget {
    pub name: String,
    /// Panel origin, e.g. `https://de1.example.com:2053`.
    pub address: String,
    /// Panel web base path, e.g. `/secret/`.
    #[serde(default = "default_panel_path")]
    pub panel_path: String,
    #[serde(default, alias = "inbound")]
    pub inbounds: Vec<u32>,
    /// Per-server credential override.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Accept self-signed panel certificates.
    #[serde(default = "default_insecure_skip_verify")]
    pub insecure_skip_verify: bool,
}

impl ServerTarget {
    /// Panel base URL: address without trailing `/` joined with a panel path
    /// that starts and ends with `/`.
    pub fn base_url(&self) -> String {
        let address = self.address.trim_end_matches('/');
        let path = self.panel_path.trim_matches('/');
        if path.is_empty() {
            format!("{address}/")
        } else {
            format!("{address}/{path}/")
        }
    }

    /// Host part of the panel address, used as a last-resort link address.
    pub fn host(&self) -> Option<&str> {
        let rest = self
            .address
            .split_once("://")
            .map_or(self.address.as_str(), |(_, r)| r);
        let authority = rest.split('/').next().unwrap_or("");
        let host = if let Some(v6) = authority.strip_prefix('[') {
            v6.split(']').next().unwrap_or("")
        } else {
            authority.split(':').next().unwrap_or("")
        };
        if host.is_empty() { None } else { Some(host) }
    }

    /// Credentials for this server, falling back to the shared ones.
    pub fn credentials<'a>(&'a self, shared: &'a PanelConfig) -> (&'a str, &'a str) {
        (
            self.username.as_deref().unwrap_or(&shared.username),
            self.password.as_deref().unwrap_or(&shared.password),
        )
    }
}

/// Subscription artifact output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "default_subscription_dir")]
    pub dir: String,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            dir: default_subscription_dir(),
        }
    }
}

/// Defaults applied to clients created by the provisioner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Quota for accounts that do not carry their own, in GB.
    #[serde(default = "default_total_gb")]
    pub total_gb: f64,
    #[serde(default = "default_duration_days")]
    pub duration_days: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            total_gb: default_total_gb(),
            duration_days: default_duration_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_path")]
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

/// Quota warning delivery. Without a webhook, warnings are only logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Bearer token sent with webhook requests.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            token: None,
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    pub listen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}
