//! Metrics collection and Prometheus exporter for panelsync.
//!
//! Covers reconciliation passes, panel call failures, provisioning,
//! published artifacts and quota warnings.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize Prometheus metrics exporter.
///
/// Starts an HTTP server on the given address to expose metrics.
/// Returns an error message if binding fails.
pub fn init_prometheus(listen: &str) -> Result<(), String> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| format!("invalid metrics listen address: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install prometheus exporter: {}", e))?;

    Ok(())
}

// ============================================================================
// Metric Names
// ============================================================================

/// Total number of completed reconciliation passes.
pub const PASSES_TOTAL: &str = "panelsync_passes_total";
/// Total number of passes that ended with an unexpected error.
pub const PASS_FAILURES_TOTAL: &str = "panelsync_pass_failures_total";
/// Pass duration histogram (seconds).
pub const PASS_DURATION_SECONDS: &str = "panelsync_pass_duration_seconds";
/// Users processed in the last pass.
pub const USERS_LAST_PASS: &str = "panelsync_users_last_pass";
/// Servers with a usable session in the last pass.
pub const SERVERS_AVAILABLE: &str = "panelsync_servers_available";
/// Total panel call failures, labelled by server and error kind.
pub const PANEL_ERRORS_TOTAL: &str = "panelsync_panel_errors_total";
/// Total clients created by the provisioner.
pub const CLIENTS_PROVISIONED_TOTAL: &str = "panelsync_clients_provisioned_total";
/// Total subscription artifacts written.
pub const ARTIFACTS_PUBLISHED_TOTAL: &str = "panelsync_artifacts_published_total";
/// Total artifacts left untouched (no usable link this pass).
pub const ARTIFACTS_SKIPPED_TOTAL: &str = "panelsync_artifacts_skipped_total";
/// Total quota warnings sent.
pub const WARNINGS_SENT_TOTAL: &str = "panelsync_warnings_sent_total";
/// Total notifications that failed to deliver.
pub const NOTIFY_FAILURES_TOTAL: &str = "panelsync_notify_failures_total";
/// Total number of users whose sync failed, by error kind.
pub const USER_FAILURES_TOTAL: &str = "panelsync_user_failures_total";

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a finished pass.
#[inline]
pub fn record_pass(duration_secs: f64, users: usize) {
    counter!(PASSES_TOTAL).increment(1);
    histogram!(PASS_DURATION_SECONDS).record(duration_secs);
    #[allow(clippy::cast_precision_loss)]
    gauge!(USERS_LAST_PASS).set(users as f64);
}

/// Record a pass that failed outright.
#[inline]
pub fn record_pass_failure() {
    counter!(PASS_FAILURES_TOTAL).increment(1);
}

/// Record how many servers were reachable at the start of a pass.
#[inline]
pub fn set_servers_available(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!(SERVERS_AVAILABLE).set(count as f64);
}

/// Record a failed panel call.
#[inline]
pub fn record_panel_error(server: &str, kind: &'static str) {
    counter!(PANEL_ERRORS_TOTAL, "server" => server.to_string(), "kind" => kind).increment(1);
}

/// Record a client created on a panel.
#[inline]
pub fn record_client_provisioned(server: &str) {
    counter!(CLIENTS_PROVISIONED_TOTAL, "server" => server.to_string()).increment(1);
}

/// Record a subscription artifact written.
#[inline]
pub fn record_artifact_published() {
    counter!(ARTIFACTS_PUBLISHED_TOTAL).increment(1);
}

/// Record a subscription artifact left as-is.
#[inline]
pub fn record_artifact_skipped() {
    counter!(ARTIFACTS_SKIPPED_TOTAL).increment(1);
}

/// Record a quota warning sent.
#[inline]
pub fn record_warning_sent() {
    counter!(WARNINGS_SENT_TOTAL).increment(1);
}

/// Record a user whose sync failed.
#[inline]
pub fn record_user_failure(kind: &'static str) {
    counter!(USER_FAILURES_TOTAL, "kind" => kind).increment(1);
}

/// Record a notification delivery failure.
#[inline]
pub fn record_notify_failure() {
    counter!(NOTIFY_FAILURES_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_exporter_is_noop() {
        record_pass(0.5, 3);
        record_panel_error("de-1", "timeout");
        record_client_provisioned("de-1");
        record_artifact_published();
        record_warning_sent();
        record_user_failure("publish");
    }

    #[test]
    fn invalid_listen_address() {
        assert!(init_prometheus("not-an-addr").is_err());
    }
}
