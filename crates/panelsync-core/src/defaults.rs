//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Sync Loop Defaults
// ============================================================================

/// Default sleep between two reconciliation passes, in seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 120;
/// Default number of users reconciled concurrently within one pass.
pub const DEFAULT_SYNC_CONCURRENCY: usize = 8;
/// Default usage percentage at which the quota warning fires.
pub const DEFAULT_WARNING_THRESHOLD_PERCENT: u8 = 90;

// ============================================================================
// Panel Client Defaults
// ============================================================================

/// Default per-call timeout for panel requests, in seconds.
pub const DEFAULT_PANEL_CALL_TIMEOUT_SECS: u64 = 15;
/// Default TCP connect timeout for panel requests, in seconds.
pub const DEFAULT_PANEL_CONNECT_TIMEOUT_SECS: u64 = 5;
/// Default panel web base path.
pub const DEFAULT_PANEL_PATH: &str = "/";
/// Accept self-signed panel certificates (off unless set per server).
pub const DEFAULT_INSECURE_SKIP_VERIFY: bool = false;

// ============================================================================
// Provisioning Policy Defaults
// ============================================================================

/// Default quota for newly provisioned clients, in GB.
pub const DEFAULT_TOTAL_GB: f64 = 30.0;
/// Default lifetime of newly provisioned clients, in days.
pub const DEFAULT_DURATION_DAYS: u32 = 30;
/// Length of the generated per-client subscription id.
pub const CLIENT_SUB_ID_LEN: usize = 16;

// ============================================================================
// Storage Defaults
// ============================================================================

/// Default directory holding subscription artifacts.
pub const DEFAULT_SUBSCRIPTION_DIR: &str = "sub";
/// Default account registry file.
pub const DEFAULT_REGISTRY_PATH: &str = "users.yaml";

// ============================================================================
// Notification Defaults
// ============================================================================

/// Default webhook delivery timeout, in seconds.
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;
/// Template key used for quota warnings.
pub const TEMPLATE_QUOTA_WARNING: &str = "quota_warning";

// ============================================================================
// Link Defaults
// ============================================================================

/// Placeholder uuid carried by the status pseudo-link.
pub const STATUS_LINK_UUID: &str = "00000000-0000-0000-0000-000000000000";
/// Placeholder host carried by the status pseudo-link.
pub const STATUS_LINK_HOST: &str = "1.1.1.1";
/// Placeholder port carried by the status pseudo-link.
pub const STATUS_LINK_PORT: u16 = 1;
