//! Per-pass panel sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use panelsync_config::{PanelConfig, ServerTarget};
use panelsync_panel::{HttpPanel, PanelApi, PanelError};

/// A logged-in panel shared by one pass.
pub type SharedPanel = Arc<dyn PanelApi>;

/// Opens sessions to configured servers.
#[async_trait]
pub trait PanelConnector: Send + Sync {
    /// Return a logged-in panel for `target`.
    async fn connect(&self, target: &ServerTarget) -> Result<SharedPanel, PanelError>;
}

/// Connects over HTTP with the shared credentials from `[panel]`.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    panel: PanelConfig,
}

impl HttpConnector {
    pub fn new(panel: PanelConfig) -> Self {
        Self { panel }
    }
}

#[async_trait]
impl PanelConnector for HttpConnector {
    async fn connect(&self, target: &ServerTarget) -> Result<SharedPanel, PanelError> {
        let panel = HttpPanel::from_target(target, &self.panel)?;
        panel.login().await?;
        Ok(Arc::new(panel))
    }
}

/// Hands out pre-built panels by server name.
#[derive(Default)]
pub struct StaticConnector {
    panels: HashMap<String, SharedPanel>,
}

impl StaticConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the panel for `server`.
    pub fn with_panel(mut self, server: &str, panel: SharedPanel) -> Self {
        self.panels.insert(server.to_string(), panel);
        self
    }
}

#[async_trait]
impl PanelConnector for StaticConnector {
    async fn connect(&self, target: &ServerTarget) -> Result<SharedPanel, PanelError> {
        let panel = self
            .panels
            .get(&target.name)
            .cloned()
            .ok_or_else(|| PanelError::Transport(format!("no panel for {}", target.name)))?;
        panel.login().await?;
        Ok(panel)
    }
}

/// One server's session for the current pass. `panel` is `None` when the
/// server could not be reached or refused our credentials.
///
/// An auth failure after login takes the server out for the rest of the
/// pass; clones share that state.
#[derive(Clone)]
pub struct Session {
    pub target: ServerTarget,
    pub panel: Option<SharedPanel>,
    auth_failed: Arc<AtomicBool>,
}

impl Session {
    pub fn new(target: ServerTarget, panel: Option<SharedPanel>) -> Self {
        Self {
            target,
            panel,
            auth_failed: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.panel.is_some() && !self.auth_failed.load(Ordering::Acquire)
    }

    /// The panel, while the server is still usable this pass.
    pub fn active_panel(&self) -> Option<&dyn PanelApi> {
        if self.auth_failed.load(Ordering::Acquire) {
            return None;
        }
        self.panel.as_deref()
    }

    /// Mark the session rejected. Returns `true` for the first caller only.
    pub fn mark_auth_failed(&self) -> bool {
        !self.auth_failed.swap(true, Ordering::AcqRel)
    }
}

/// Log in to every server concurrently. Output order matches `servers`.
pub async fn connect_all(
    connector: &Arc<dyn PanelConnector>,
    servers: &[ServerTarget],
) -> Vec<Session> {
    let mut set = JoinSet::new();
    for (idx, target) in servers.iter().cloned().enumerate() {
        let connector = Arc::clone(connector);
        set.spawn(async move {
            let result = connector.connect(&target).await;
            (idx, result)
        });
    }

    let mut panels: Vec<Option<SharedPanel>> = vec![None; servers.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, Ok(panel))) => {
                debug!(server = %servers[idx].name, "session established");
                panels[idx] = Some(panel);
            }
            Ok((idx, Err(e))) => {
                let server = &servers[idx].name;
                panelsync_metrics::record_panel_error(server, e.kind());
                warn!(server = %server, error = %e, "server unavailable this pass");
            }
            Err(e) => error!(error = %e, "connect task failed"),
        }
    }

    servers
        .iter()
        .cloned()
        .zip(panels)
        .map(|(target, panel)| Session::new(target, panel))
        .collect()
}

#[cfg(test)]
mod tests {
    use panelsync_panel::MemoryPanel;

    use super::*;

    fn target(name: &str) -> ServerTarget {
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

    #[tokio::test]
    async fn unreachable_servers_have_no_session() {
        let down = Arc::new(MemoryPanel::new());
        down.set_unreachable(true);
        let connector: Arc<dyn PanelConnector> = Arc::new(
            StaticConnector::new()
                .with_panel("a", Arc::new(MemoryPanel::new()))
                .with_panel("b", down),
        );
        let servers = [target("a"), target("b"), target("c")];

        let sessions = connect_all(&connector, &servers).await;
        let names: Vec<_> = sessions.iter().map(|s| s.target.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(sessions[0].is_available());
        assert!(!sessions[1].is_available());
        assert!(!sessions[2].is_available());
    }

    #[test]
    fn auth_failure_is_shared_across_clones() {
        let session = Session::new(target("a"), Some(Arc::new(MemoryPanel::new())));
        let clone = session.clone();
        assert!(clone.active_panel().is_some());

        assert!(session.mark_auth_failed());
        assert!(!clone.mark_auth_failed());
        assert!(!clone.is_available());
        assert!(clone.active_panel().is_none());
    }
}
