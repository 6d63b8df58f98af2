//! User notifications.
//!
//! Delivery is fire-and-forget: a failed notification is logged and never
//! retried, and it never holds up a pass.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use panelsync_core::{TEMPLATE_QUOTA_WARNING, bytes_to_gb};

use crate::error::NotifyError;
use crate::quota::QuotaSummary;
use crate::registry::UserAccount;

/// A templated message for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub user_id: String,
    pub template: String,
    pub params: BTreeMap<String, String>,
}

impl Notification {
    /// Quota warning for `account` at the usage in `summary`.
    pub fn quota_warning(account: &UserAccount, summary: &QuotaSummary) -> Self {
        let percent = summary.usage_percent().unwrap_or(0.0);
        let params = BTreeMap::from([
            ("used_gb".to_string(), format!("{:.2}", bytes_to_gb(summary.used_bytes))),
            ("total_gb".to_string(), format!("{:.2}", bytes_to_gb(summary.quota_bytes))),
            ("percent".to_string(), format!("{percent:.0}")),
            ("language".to_string(), account.language.clone()),
        ]);
        Self {
            user_id: account.id.clone(),
            template: TEMPLATE_QUOTA_WARNING.to_string(),
            params,
        }
    }
}

/// Outbound notification channel.
///
/// `notify` must not block on delivery.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            user = %notification.user_id,
            template = %notification.template,
            params = ?notification.params,
            "notification"
        );
        Ok(())
    }
}

/// Posts notifications as JSON to a webhook from a background task.
pub struct WebhookNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl WebhookNotifier {
    /// Spawn the delivery task. Must be called inside a tokio runtime.
    pub fn new(url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .user_agent(panelsync_core::user_agent())
            .timeout(timeout)
            .build()?;
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
        let url = url.to_string();
        let token = token.map(str::to_string);

        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                if let Err(e) = deliver(&client, &url, token.as_deref(), &notification).await {
                    panelsync_metrics::record_notify_failure();
                    warn!(user = %notification.user_id, error = %e, "notification delivery failed");
                }
            }
            debug!("webhook notifier stopped");
        });

        Ok(Self { sender: tx })
    }
}

async fn deliver(
    client: &reqwest::Client,
    url: &str,
    token: Option<&str>,
    notification: &Notification,
) -> Result<(), NotifyError> {
    let mut request = client.post(url).json(notification);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let status = request.send().await?.status();
    if !status.is_success() {
        return Err(NotifyError::Status(status.as_u16()));
    }
    Ok(())
}

impl Notifier for WebhookNotifier {
    #[inline]
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sender
            .send(notification)
            .map_err(|_| NotifyError::Closed)
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().push(notification);
        Ok(())
    }
}
