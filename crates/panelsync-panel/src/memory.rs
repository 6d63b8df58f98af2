//! In-memory panel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::PanelError;
use crate::model::{ClientIdentity, ClientRecord, InboundConfig, TrafficSample};
use crate::traits::PanelApi;

/// Panel state kept in memory.
///
/// Behaves like a 3X-UI panel for the operations in [`PanelApi`]: duplicate
/// emails conflict, every client gets a zeroed traffic row on creation, and
/// the whole panel can be switched unreachable to simulate outages.
#[derive(Debug, Default)]
pub struct MemoryPanel {
    state: Mutex<State>,
    unreachable: AtomicBool,
    session_rejected: AtomicBool,
    add_calls: AtomicUsize,
    requests: AtomicUsize,
}

#[derive(Debug, Default)]
struct State {
    inbounds: HashMap<u32, InboundConfig>,
    traffic: HashMap<String, TrafficSample>,
}

impl MemoryPanel {
    /// Create a new empty panel.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a set of inbounds.
    pub fn from_inbounds<I>(inbounds: I) -> Self
    where
        I: IntoIterator<Item = InboundConfig>,
    {
        let panel = Self::new();
        for inbound in inbounds {
            panel.insert_inbound(inbound);
        }
        panel
    }

    /// Add or replace an inbound. Its clients get traffic rows.
    pub fn insert_inbound(&self, inbound: InboundConfig) {
        let mut state = self.state.lock();
        for client in &inbound.clients {
            state
                .traffic
                .entry(client.email.clone())
                .or_insert_with(|| TrafficSample {
                    total_bytes: client.total_bytes,
                    expiry_ms: client.expiry_ms,
                    ..TrafficSample::default()
                });
        }
        state.inbounds.insert(inbound.id, inbound);
    }

    /// Set a client's counters, creating the traffic row if needed.
    pub fn set_traffic(&self, email: &str, uploaded: u64, downloaded: u64) {
        let mut state = self.state.lock();
        let row = state.traffic.entry(email.to_string()).or_default();
        row.uploaded = uploaded;
        row.downloaded = downloaded;
    }

    /// Make every call fail with a transport error (or succeed again).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Accept logins but answer every other call with an auth error, like a
    /// panel that drops the session right after re-login.
    pub fn set_session_rejected(&self, rejected: bool) {
        self.session_rejected.store(rejected, Ordering::SeqCst);
    }

    /// Number of clients with `email` on an inbound.
    pub fn client_count(&self, inbound_id: u32, email: &str) -> usize {
        self.state
            .lock()
            .inbounds
            .get(&inbound_id)
            .map_or(0, |i| i.clients.iter().filter(|c| c.email == email).count())
    }

    /// Total `add_client` calls that reached the panel.
    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    /// Calls other than `login` that reached the panel.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), PanelError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(PanelError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }

    fn check_session(&self) -> Result<(), PanelError> {
        self.check_reachable()?;
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.session_rejected.load(Ordering::SeqCst) {
            return Err(PanelError::Auth("session rejected after re-login".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PanelApi for MemoryPanel {
    async fn login(&self) -> Result<(), PanelError> {
        self.check_reachable()
    }

    async fn get_inbound(&self, inbound_id: u32) -> Result<InboundConfig, PanelError> {
        self.check_session()?;
        self.state
            .lock()
            .inbounds
            .get(&inbound_id)
            .cloned()
            .ok_or_else(|| PanelError::NotFound(format!("inbound {inbound_id}")))
    }

    async fn add_client(&self, inbound_id: u32, client: &ClientRecord) -> Result<(), PanelError> {
        self.check_session()?;
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        let inbound = state
            .inbounds
            .get_mut(&inbound_id)
            .ok_or_else(|| PanelError::NotFound(format!("inbound {inbound_id}")))?;
        if inbound.clients.iter().any(|c| c.email == client.email) {
            return Err(PanelError::Conflict(format!(
                "Duplicate email: {}",
                client.email
            )));
        }
        inbound.clients.push(client.clone());
        state.traffic.insert(
            client.email.clone(),
            TrafficSample {
                total_bytes: client.total_bytes,
                expiry_ms: client.expiry_ms,
                ..TrafficSample::default()
            },
        );
        Ok(())
    }

    async fn update_client(
        &self,
        inbound_id: u32,
        client: &ClientRecord,
    ) -> Result<(), PanelError> {
        self.check_session()?;
        let mut state = self.state.lock();
        let inbound = state
            .inbounds
            .get_mut(&inbound_id)
            .ok_or_else(|| PanelError::NotFound(format!("inbound {inbound_id}")))?;
        let slot = inbound
            .clients
            .iter_mut()
            .find(|c| c.uuid == client.uuid)
            .ok_or_else(|| PanelError::NotFound(format!("client {}", client.uuid)))?;
        *slot = client.clone();
        if let Some(row) = state.traffic.get_mut(&client.email) {
            row.total_bytes = client.total_bytes;
            row.expiry_ms = client.expiry_ms;
        }
        Ok(())
    }

    async fn delete_client(&self, inbound_id: u32, client_uuid: &str) -> Result<(), PanelError> {
        self.check_session()?;
        let mut state = self.state.lock();
        let Some(inbound) = state.inbounds.get_mut(&inbound_id) else {
            return Err(PanelError::NotFound(format!("inbound {inbound_id}")));
        };
        let removed: Vec<String> = inbound
            .clients
            .iter()
            .filter(|c| c.uuid == client_uuid)
            .map(|c| c.email.clone())
            .collect();
        inbound.clients.retain(|c| c.uuid != client_uuid);
        for email in removed {
            state.traffic.remove(&email);
        }
        Ok(())
    }

    async fn get_traffic(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Option<TrafficSample>, PanelError> {
        self.check_session()?;
        Ok(self.state.lock().traffic.get(identity.as_str()).copied())
    }
}
