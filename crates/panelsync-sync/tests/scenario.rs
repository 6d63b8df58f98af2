//! End-to-end passes over in-memory panels.
//!
//! These tests verify:
//! - Usage sums only pairs that could be read; unreachable servers are skipped
//! - The artifact carries the status link plus one link per reachable pair
//! - Quota warnings fire once per upward crossing and clear silently
//! - Provisioning is idempotent across passes
//! - Artifacts are left alone when nothing is reachable
//! - A session rejected mid-pass takes its server out for the rest of the pass
#![allow(clippy::tests_outside_test_module)]

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use panelsync_config::{
    Config, LoggingConfig, MetricsConfig, NotifyConfig, PanelConfig, PolicyConfig,
    RegistryConfig, ServerTarget, SubscriptionConfig, SyncConfig,
};
use panelsync_core::GB_TO_BYTES;
use panelsync_link::status_link;
use panelsync_panel::{
    ClientRecord, InboundConfig, MemoryPanel, ResetInterval, Security, StreamSettings, Transport,
};
use panelsync_sync::{
    MemoryRegistry, Orchestrator, RecordingNotifier, StaticConnector, UserAccount,
};

const UUID_A: &str = "aaaaaaaa-0000-4000-8000-000000000001";
const UUID_B: &str = "bbbbbbbb-0000-4000-8000-000000000002";

// ============================================================================
// Fixtures
// ============================================================================

fn inbound(remark: &str, listen: &str, clients: Vec<ClientRecord>) -> InboundConfig {
    InboundConfig {
        id: 1,
        remark: remark.into(),
        protocol: "vless".into(),
        enabled: true,
        listen: listen.into(),
        port: 443,
        clients,
        stream: Ok(StreamSettings {
            transport: Transport::Tcp {
                http_header: false,
                http_path: None,
            },
            security: Security::None,
            external_proxies: Vec::new(),
        }),
        reset_interval: ResetInterval::Never,
        last_reset_ms: 0,
    }
}

fn client(uuid: &str, email: &str) -> ClientRecord {
    ClientRecord {
        uuid: uuid.into(),
        email: email.into(),
        enabled: true,
        total_bytes: 10 * GB_TO_BYTES,
        expiry_ms: 0,
        sub_id: "0123456789abcdef".into(),
        tg_id: email.split('#').next().unwrap_or_default().into(),
        flow: String::new(),
        limit_ip: 0,
        reset_days: 0,
    }
}

fn server(name: &str) -> ServerTarget {
    ServerTarget {
        name: name.into(),
        address: format!("https://{name}.example.com"),
        panel_path: "/".into(),
        inbounds: vec![1],
        username: None,
        password: None,
        insecure_skip_verify: false,
    }
}

fn config(dir: &Path, servers: Vec<ServerTarget>) -> Config {
    Config {
        sync: SyncConfig {
            interval_secs: 1,
            concurrency: 4,
            warning_threshold_percent: 90,
        },
        panel: PanelConfig::default(),
        subscription: SubscriptionConfig {
            dir: dir.to_string_lossy().into_owned(),
        },
        policy: PolicyConfig {
            total_gb: 30.0,
            duration_days: 30,
        },
        registry: RegistryConfig::default(),
        notify: NotifyConfig::default(),
        metrics: MetricsConfig::default(),
        logging: LoggingConfig::default(),
        servers,
    }
}

fn account(id: &str, token: Option<&str>, quota_gb: f64) -> UserAccount {
    UserAccount {
        id: id.into(),
        display_name: format!("user {id}"),
        language: "en".into(),
        subscription: token.map(str::to_string),
        quota_gb: Some(quota_gb),
        warning_sent: false,
    }
}

fn read_artifact(dir: &Path, token: &str) -> Vec<String> {
    let body = std::fs::read_to_string(dir.join(token)).unwrap();
    let decoded = String::from_utf8(STANDARD.decode(body).unwrap()).unwrap();
    decoded.lines().map(str::to_string).collect()
}

struct Harness {
    panel_a: Arc<MemoryPanel>,
    panel_b: Arc<MemoryPanel>,
    registry: Arc<MemoryRegistry>,
    notifier: Arc<RecordingNotifier>,
    orchestrator: Orchestrator,
}

/// Two servers with one inbound each; user 42 already has a client on both.
fn two_server_harness(dir: &Path) -> Harness {
    let panel_a = Arc::new(MemoryPanel::from_inbounds([inbound(
        "A",
        "198.51.100.1",
        vec![client(UUID_A, "42#1")],
    )]));
    let panel_b = Arc::new(MemoryPanel::from_inbounds([inbound(
        "B",
        "198.51.100.2",
        vec![client(UUID_B, "42#1")],
    )]));
    let registry = Arc::new(MemoryRegistry::new(vec![
        account("42", Some("tok42"), 10.0),
        account("7", None, 10.0),
    ]));
    let notifier = Arc::new(RecordingNotifier::new());
    let connector = StaticConnector::new()
        .with_panel("a", panel_a.clone())
        .with_panel("b", panel_b.clone());
    let orchestrator = Orchestrator::new(
        config(dir, vec![server("a"), server("b")]),
        Arc::new(connector),
        registry.clone(),
        notifier.clone(),
    );
    Harness {
        panel_a,
        panel_b,
        registry,
        notifier,
        orchestrator,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn partial_outage_then_warning_hysteresis() {
    let dir = tempfile::tempdir().unwrap();
    let h = two_server_harness(dir.path());
    h.panel_a.set_traffic("42#1", GB_TO_BYTES, 2 * GB_TO_BYTES);
    h.panel_b.set_unreachable(true);

    // Pass 1: B down, 3 of 10 GB used.
    let report = h.orchestrator.run_pass().await.unwrap();
    assert_eq!(report.servers_available, 1);
    assert_eq!(report.users, 1);
    assert_eq!(report.published, 1);
    assert_eq!(report.warnings, 0);

    let lines = read_artifact(dir.path(), "tok42");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], status_link("🌐 7.00/10.00 GB ⏳ Unlimited"));
    assert!(lines[1].starts_with(&format!("vless://{UUID_A}@198.51.100.1:443?")));
    assert!(lines[1].ends_with("#A"));
    assert!(h.notifier.sent().is_empty());
    assert_eq!(h.registry.writes(), 0);

    // Pass 2: B back with 6 GB down, 9 of 10 GB is exactly the threshold.
    h.panel_b.set_unreachable(false);
    h.panel_b.set_traffic("42#1", 0, 6 * GB_TO_BYTES);
    let report = h.orchestrator.run_pass().await.unwrap();
    assert_eq!(report.servers_available, 2);
    assert_eq!(report.warnings, 1);

    let lines = read_artifact(dir.path(), "tok42");
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], status_link("🌐 1.00/10.00 GB ⏳ Unlimited"));
    assert!(lines[2].starts_with(&format!("vless://{UUID_B}@198.51.100.2:443?")));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].user_id, "42");
    assert_eq!(sent[0].template, "quota_warning");
    assert_eq!(sent[0].params["percent"], "90");
    assert!(h.registry.get("42").unwrap().warning_sent);

    // Passes 3-4: still over, no repeat.
    for _ in 0..2 {
        let report = h.orchestrator.run_pass().await.unwrap();
        assert_eq!(report.warnings, 0);
    }
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.registry.writes(), 1);

    // Pass 5: counters reset on the panels, flag clears without a message.
    h.panel_a.set_traffic("42#1", 0, 0);
    h.panel_b.set_traffic("42#1", 0, GB_TO_BYTES);
    let report = h.orchestrator.run_pass().await.unwrap();
    assert_eq!(report.cleared, 1);
    assert_eq!(h.notifier.sent().len(), 1);
    assert!(!h.registry.get("42").unwrap().warning_sent);
    assert_eq!(h.registry.writes(), 2);

    // Existing clients were never re-added.
    assert_eq!(h.panel_a.add_calls(), 0);
    assert_eq!(h.panel_b.add_calls(), 0);
}

#[tokio::test]
async fn total_outage_keeps_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let h = two_server_harness(dir.path());
    h.orchestrator.run_pass().await.unwrap();
    let before = std::fs::read_to_string(dir.path().join("tok42")).unwrap();

    h.panel_a.set_unreachable(true);
    h.panel_b.set_unreachable(true);
    let report = h.orchestrator.run_pass().await.unwrap();
    assert_eq!(report.servers_available, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.published, 0);

    let after = std::fs::read_to_string(dir.path().join("tok42")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn unknown_usage_does_not_clear_warning() {
    let dir = tempfile::tempdir().unwrap();
    let h = two_server_harness(dir.path());
    h.panel_a.set_traffic("42#1", 0, 9 * GB_TO_BYTES);
    h.orchestrator.run_pass().await.unwrap();
    assert!(h.registry.get("42").unwrap().warning_sent);

    h.panel_a.set_unreachable(true);
    h.panel_b.set_unreachable(true);
    let report = h.orchestrator.run_pass().await.unwrap();
    assert_eq!(report.cleared, 0);
    assert!(h.registry.get("42").unwrap().warning_sent);
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn partial_outage_does_not_rearm_warning() {
    let dir = tempfile::tempdir().unwrap();
    let h = two_server_harness(dir.path());
    h.panel_a.set_traffic("42#1", GB_TO_BYTES, 2 * GB_TO_BYTES);
    h.panel_b.set_traffic("42#1", 0, 6 * GB_TO_BYTES);
    let report = h.orchestrator.run_pass().await.unwrap();
    assert_eq!(report.warnings, 1);

    // Only A is readable: 3 GB is a lower bound, not evidence of a drop.
    h.panel_b.set_unreachable(true);
    let report = h.orchestrator.run_pass().await.unwrap();
    assert_eq!(report.cleared, 0);
    assert!(h.registry.get("42").unwrap().warning_sent);

    h.panel_b.set_unreachable(false);
    let report = h.orchestrator.run_pass().await.unwrap();
    assert_eq!(report.warnings, 0);
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.registry.writes(), 1);
}

#[tokio::test]
async fn rejected_session_skips_rest_of_server() {
    let dir = tempfile::tempdir().unwrap();
    let panel_a = Arc::new(MemoryPanel::from_inbounds((1..=3).map(|id| InboundConfig {
        id,
        ..inbound("A", "198.51.100.1", vec![client(UUID_A, &format!("42#{id}"))])
    })));
    let panel_b = Arc::new(MemoryPanel::from_inbounds([inbound(
        "B",
        "198.51.100.2",
        vec![client(UUID_B, "42#1")],
    )]));
    panel_a.set_session_rejected(true);
    panel_b.set_traffic("42#1", 0, 2 * GB_TO_BYTES);

    let mut server_a = server("a");
    server_a.inbounds = vec![1, 2, 3];
    let orchestrator = Orchestrator::new(
        config(dir.path(), vec![server_a, server("b")]),
        Arc::new(
            StaticConnector::new()
                .with_panel("a", panel_a.clone())
                .with_panel("b", panel_b.clone()),
        ),
        Arc::new(MemoryRegistry::new(vec![account("42", Some("tok42"), 10.0)])),
        Arc::new(RecordingNotifier::new()),
    );

    let report = orchestrator.run_pass().await.unwrap();
    assert_eq!(report.published, 1);
    // The first rejected call ends the server's pass.
    assert_eq!(panel_a.requests(), 1);
    assert_eq!(panel_a.add_calls(), 0);

    let lines = read_artifact(dir.path(), "tok42");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], status_link("🌐 8.00/10.00 GB ⏳ Unlimited"));
    assert!(lines[1].starts_with(&format!("vless://{UUID_B}@198.51.100.2:443?")));
}

#[tokio::test]
async fn new_user_is_provisioned_once() {
    let dir = tempfile::tempdir().unwrap();
    let panel = Arc::new(MemoryPanel::from_inbounds([inbound(
        "",
        "0.0.0.0",
        Vec::new(),
    )]));
    let registry = Arc::new(MemoryRegistry::new(vec![account("99", Some("tok99"), 5.0)]));
    let orchestrator = Orchestrator::new(
        config(dir.path(), vec![server("edge")]),
        Arc::new(StaticConnector::new().with_panel("edge", panel.clone())),
        registry,
        Arc::new(RecordingNotifier::new()),
    );

    orchestrator.run_pass().await.unwrap();
    orchestrator.run_pass().await.unwrap();

    assert_eq!(panel.client_count(1, "99#1"), 1);
    assert_eq!(panel.add_calls(), 1);

    // Unroutable listen address falls back to the server host; empty remark
    // falls back to the user label.
    let lines = read_artifact(dir.path(), "tok99");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("@edge.example.com:443?"), "{}", lines[1]);
    assert!(lines[1].ends_with("#Config-99"), "{}", lines[1]);
}
