//! Periodic pass loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use panelsync_config::Config;

use crate::connector::{PanelConnector, connect_all};
use crate::error::SyncError;
use crate::notify::Notifier;
use crate::pipeline::{PassContext, sync_user};
use crate::publish::{PublishOutcome, Publisher};
use crate::registry::AccountRegistry;
use crate::warning::{Transition, WarningPolicy};

/// Totals for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub servers_available: usize,
    pub users: usize,
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
    pub cleared: usize,
}

/// Drives passes over every registered user.
pub struct Orchestrator {
    config: Config,
    connector: Arc<dyn PanelConnector>,
    registry: Arc<dyn AccountRegistry>,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        connector: Arc<dyn PanelConnector>,
        registry: Arc<dyn AccountRegistry>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            connector,
            registry,
            notifier,
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.config.sync.interval_secs)
    }

    /// Run one full pass. Per-user failures are logged and counted; only a
    /// registry load failure aborts the pass.
    pub async fn run_pass(&self) -> Result<PassReport, SyncError> {
        let started = Instant::now();
        let accounts = self.registry.load().await?;
        let sessions = connect_all(&self.connector, &self.config.servers).await;

        let mut report = PassReport {
            servers_available: sessions.iter().filter(|s| s.is_available()).count(),
            ..PassReport::default()
        };
        panelsync_metrics::set_servers_available(report.servers_available);

        let ctx = Arc::new(PassContext {
            sessions,
            publisher: Publisher::new(&self.config.subscription.dir),
            policy: self.config.policy.clone(),
            warning: WarningPolicy::new(self.config.sync.warning_threshold_percent),
            registry: Arc::clone(&self.registry),
            notifier: Arc::clone(&self.notifier),
        });

        let limiter = Arc::new(Semaphore::new(self.config.sync.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for account in accounts {
            if account.subscription.is_none() {
                continue;
            }
            let permit = Arc::clone(&limiter)
                .acquire_owned()
                .await
                .map_err(|e| SyncError::Worker(e.to_string()))?;
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move {
                let _permit = permit;
                let result = sync_user(&ctx, &account, &Local, Utc::now()).await;
                (account.id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(Some(user)))) => {
                    report.users += 1;
                    match user.outcome {
                        PublishOutcome::Written(_) => report.published += 1,
                        PublishOutcome::Skipped => report.skipped += 1,
                    }
                    match user.transition {
                        Transition::Warn => report.warnings += 1,
                        Transition::Clear => report.cleared += 1,
                        Transition::Stay => {}
                    }
                }
                Ok((_, Ok(None))) => {}
                Ok((user, Err(e))) => {
                    report.users += 1;
                    report.failed += 1;
                    panelsync_metrics::record_user_failure(e.kind());
                    warn!(user = %user, kind = e.kind(), error = %e, "user sync failed");
                }
                Err(e) => {
                    report.users += 1;
                    report.failed += 1;
                    panelsync_metrics::record_user_failure(panelsync_core::ERROR_INTERNAL);
                    error!(error = %e, "user task failed");
                }
            }
        }

        let elapsed = started.elapsed();
        panelsync_metrics::record_pass(elapsed.as_secs_f64(), report.users);
        info!(
            users = report.users,
            published = report.published,
            skipped = report.skipped,
            failed = report.failed,
            warnings = report.warnings,
            servers = report.servers_available,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "pass finished"
        );
        Ok(report)
    }

    /// Run passes until `shutdown` fires. Passes never overlap and a pass in
    /// progress always completes; the interval is slept after each pass.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.sync.interval_secs,
            servers = self.config.servers.len(),
            "sync loop started"
        );
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            debug!("pass starting");
            if let Err(e) = self.run_pass().await {
                panelsync_metrics::record_pass_failure();
                error!(error = %e, "pass failed");
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval()) => {}
            }
        }
        info!("sync loop stopped");
    }
}
