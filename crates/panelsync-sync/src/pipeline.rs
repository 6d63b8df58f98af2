//! One user's reconciliation within a pass.
//!
//! For every (server, inbound) pair in config order: provision the client,
//! read its traffic and rebuild its link. Then publish the artifact and run
//! the warning state machine. All reads finish before the single write.
//!
//! A server whose session is rejected mid-pass counts as unavailable for
//! every pair after that, across all users.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info, warn};

use panelsync_config::PolicyConfig;
use panelsync_link::{build_link, status_link};
use panelsync_panel::{ClientIdentity, PanelError};

use crate::connector::Session;
use crate::error::SyncError;
use crate::notify::{Notification, Notifier};
use crate::provision::{ClientPolicy, ensure_client};
use crate::publish::{PublishOutcome, Publisher};
use crate::quota::{QuotaAggregator, QuotaSummary};
use crate::registry::{AccountRegistry, UserAccount};
use crate::warning::{Transition, WarningPolicy, WarningState};

/// Everything a user task needs, shared across one pass.
pub struct PassContext {
    pub sessions: Vec<Session>,
    pub publisher: Publisher,
    pub policy: PolicyConfig,
    pub warning: WarningPolicy,
    pub registry: Arc<dyn AccountRegistry>,
    pub notifier: Arc<dyn Notifier>,
}

/// Outcome of one user's sync.
#[derive(Debug, Clone)]
pub struct UserReport {
    pub user_id: String,
    pub summary: QuotaSummary,
    pub links: usize,
    pub outcome: PublishOutcome,
    pub transition: Transition,
}

/// Sync one account. Returns `Ok(None)` for accounts without a
/// subscription token.
pub async fn sync_user<Tz>(
    ctx: &PassContext,
    account: &UserAccount,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Result<Option<UserReport>, SyncError>
where
    Tz: TimeZone + Sync,
{
    let Some(token) = account.subscription.as_deref() else {
        debug!(user = %account.id, "no subscription token, skipping");
        return Ok(None);
    };

    let quota_bytes = account.quota_bytes(ctx.policy.total_gb);
    let client_policy = ClientPolicy {
        total_bytes: quota_bytes,
        duration_days: ctx.policy.duration_days,
    };
    let mut aggregator = QuotaAggregator::new(quota_bytes);
    let mut links = Vec::new();

    for session in &ctx.sessions {
        let target = &session.target;
        for &inbound_id in &target.inbounds {
            let Some(panel) = session.active_panel() else {
                aggregator.record_unavailable();
                continue;
            };
            let identity = ClientIdentity::new(&account.id, inbound_id);

            match ensure_client(panel, inbound_id, &identity, client_policy, now.timestamp_millis())
                .await
            {
                Ok(provisioned) => {
                    if provisioned.created {
                        panelsync_metrics::record_client_provisioned(&target.name);
                    }
                    aggregator.record_inbound(&provisioned.inbound, tz);
                    if let Err(reason) = &provisioned.inbound.stream {
                        warn!(
                            server = %target.name,
                            inbound = inbound_id,
                            error = %reason,
                            "stream settings unusable, no link"
                        );
                    }
                    let link = provisioned.client(&identity).and_then(|client| {
                        build_link(&provisioned.inbound, &client.uuid, &account.id, target.host())
                    });
                    match link {
                        Some(link) => links.push(link),
                        None => debug!(
                            server = %target.name,
                            inbound = inbound_id,
                            user = %account.id,
                            "no link for pair"
                        ),
                    }
                }
                Err(e) => pair_failed(session, inbound_id, &account.id, &e, "provisioning"),
            }

            if !session.is_available() {
                aggregator.record_unavailable();
                continue;
            }
            let read = panel.get_traffic(&identity).await;
            if let Err(e) = &read {
                pair_failed(session, inbound_id, &account.id, e, "traffic read");
            }
            aggregator.record_read(read.as_ref().copied());
        }
    }

    let summary = aggregator.finish();
    let status = status_link(&summary.status().label(now));
    let published = ctx.publisher.publish(token, &status, &links).await;
    match &published {
        Ok(PublishOutcome::Written(_)) => panelsync_metrics::record_artifact_published(),
        Ok(PublishOutcome::Skipped) => {
            panelsync_metrics::record_artifact_skipped();
            warn!(user = %account.id, "no reachable pair, previous artifact kept");
        }
        Err(e) => warn!(user = %account.id, error = %e, "artifact write failed"),
    }

    let transition = apply_warning(ctx, account, &summary).await?;

    debug!(
        user = %account.id,
        used = summary.used_bytes,
        quota = summary.quota_bytes,
        ok_reads = summary.successful_reads,
        failed_reads = summary.failed_reads,
        links = links.len(),
        "user synced"
    );

    Ok(Some(UserReport {
        user_id: account.id.clone(),
        summary,
        links: links.len(),
        outcome: published?,
        transition,
    }))
}

/// Log and count a failed panel call. An auth failure takes the server out
/// for the rest of the pass.
fn pair_failed(
    session: &Session,
    inbound_id: u32,
    user: &str,
    error: &PanelError,
    action: &'static str,
) {
    let server = &session.target.name;
    panelsync_metrics::record_panel_error(server, error.kind());
    warn!(server = %server, inbound = inbound_id, user = %user, error = %error, "{action} failed");
    if matches!(error, PanelError::Auth(_)) && session.mark_auth_failed() {
        warn!(server = %server, "session rejected, server skipped for the rest of the pass");
    }
}

async fn apply_warning(
    ctx: &PassContext,
    account: &UserAccount,
    summary: &QuotaSummary,
) -> Result<Transition, SyncError> {
    let state = WarningState::from_flag(account.warning_sent);
    let transition = ctx.warning.evaluate(state, summary);
    match transition {
        Transition::Stay => return Ok(transition),
        Transition::Warn => {
            info!(
                user = %account.id,
                used = summary.used_bytes,
                quota = summary.quota_bytes,
                "quota warning"
            );
            panelsync_metrics::record_warning_sent();
            if let Err(e) = ctx
                .notifier
                .notify(Notification::quota_warning(account, summary))
            {
                panelsync_metrics::record_notify_failure();
                warn!(user = %account.id, error = %e, "notification not queued");
            }
        }
        Transition::Clear => {
            info!(user = %account.id, "usage back under threshold, warning cleared");
        }
    }
    ctx.registry
        .set_warning_sent(&account.id, transition.apply(state).is_warned())
        .await?;
    Ok(transition)
}
