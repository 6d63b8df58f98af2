//! CLI entry point for the sync subcommand.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use panelsync_config::{CliOverrides, Config, apply_overrides, load_config, validate_config};

use crate::connector::HttpConnector;
use crate::error::SyncError;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::orchestrator::Orchestrator;
use crate::registry::YamlRegistry;

/// CLI arguments for the sync subcommand.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "panelsync-sync",
    version,
    about = "Reconcile panel clients, quotas and subscription files"
)]
pub struct SyncArgs {
    /// Config file path (json, jsonc, yaml or toml).
    #[arg(short, long, default_value = "panelsync.toml", env = "PANELSYNC_CONFIG")]
    pub config: PathBuf,

    /// Run a single pass and exit.
    #[arg(long)]
    pub once: bool,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Run the sync loop with the given CLI arguments.
pub async fn run(args: SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(config.logging.level.as_deref().unwrap_or("info"));
    info!(
        version = panelsync_core::VERSION,
        config = %args.config.display(),
        servers = config.servers.len(),
        "panelsync starting"
    );

    if let Some(listen) = &config.metrics.listen {
        panelsync_metrics::init_prometheus(listen).map_err(SyncError::Metrics)?;
        info!(listen = %listen, "prometheus exporter listening");
    }

    let orchestrator = build_orchestrator(config)?;

    if args.once {
        orchestrator.run_pass().await?;
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    orchestrator.run(shutdown).await;
    Ok(())
}

fn build_orchestrator(config: Config) -> Result<Orchestrator, SyncError> {
    let connector = Arc::new(HttpConnector::new(config.panel.clone()));
    let registry = Arc::new(YamlRegistry::new(&config.registry.path));
    let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(
            url,
            config.notify.token.as_deref(),
            Duration::from_secs(config.notify.timeout_secs),
        )?),
        None => Arc::new(LogNotifier),
    };
    Ok(Orchestrator::new(config, connector, registry, notifier))
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_once_with_overrides() {
        let args = SyncArgs::parse_from([
            "panelsync-sync",
            "-c",
            "/etc/panelsync.yaml",
            "--once",
            "--interval-secs",
            "30",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.config, PathBuf::from("/etc/panelsync.yaml"));
        assert!(args.once);
        assert_eq!(args.overrides.interval_secs, Some(30));
        assert_eq!(args.overrides.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn defaults() {
        let args = SyncArgs::parse_from(["panelsync-sync"]);
        assert!(!args.once);
        assert_eq!(args.overrides.concurrency, None);
    }
}
