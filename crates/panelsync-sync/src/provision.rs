//! Idempotent client provisioning.

use tracing::{debug, info};
use uuid::Uuid;

use panelsync_core::{CLIENT_SUB_ID_LEN, DAYS_TO_MS};
use panelsync_panel::{ClientIdentity, ClientRecord, InboundConfig, PanelApi, PanelError};

/// Defaults applied to newly created clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientPolicy {
    /// Quota in bytes (0 = unlimited).
    pub total_bytes: u64,
    /// Lifetime from creation.
    pub duration_days: u32,
}

/// Result of [`ensure_client`].
#[derive(Debug, Clone)]
pub struct Provisioned {
    /// Inbound as last read from the panel, after any creation.
    pub inbound: InboundConfig,
    /// Whether this call created the client.
    pub created: bool,
}

impl Provisioned {
    /// The user's client on the inbound, if the panel reports one.
    pub fn client(&self, identity: &ClientIdentity) -> Option<&ClientRecord> {
        self.inbound.find_client(identity)
    }
}

/// Synthesize a fresh client for `identity`.
pub fn new_client(identity: &ClientIdentity, policy: ClientPolicy, now_ms: i64) -> ClientRecord {
    let mut sub_id = Uuid::new_v4().simple().to_string();
    sub_id.truncate(CLIENT_SUB_ID_LEN);
    ClientRecord {
        uuid: Uuid::new_v4().to_string(),
        email: identity.as_str().to_string(),
        enabled: true,
        total_bytes: policy.total_bytes,
        expiry_ms: now_ms + i64::from(policy.duration_days) * DAYS_TO_MS,
        sub_id,
        tg_id: identity.user_id().to_string(),
        flow: String::new(),
        limit_ip: 0,
        reset_days: 0,
    }
}

/// Make sure `identity` has a client on `inbound_id`.
///
/// A [`PanelError::Conflict`] from the panel means another writer created
/// the client first and counts as success. After a creation attempt the
/// inbound is fetched again, since panels may normalize what they store.
pub async fn ensure_client<P: PanelApi + ?Sized>(
    panel: &P,
    inbound_id: u32,
    identity: &ClientIdentity,
    policy: ClientPolicy,
    now_ms: i64,
) -> Result<Provisioned, PanelError> {
    let inbound = panel.get_inbound(inbound_id).await?;
    if inbound.find_client(identity).is_some() {
        return Ok(Provisioned {
            inbound,
            created: false,
        });
    }

    let client = new_client(identity, policy, now_ms);
    let created = match panel.add_client(inbound_id, &client).await {
        Ok(()) => {
            info!(client = %identity, inbound = inbound_id, "client created");
            true
        }
        Err(PanelError::Conflict(msg)) => {
            debug!(client = %identity, inbound = inbound_id, msg = %msg, "client already exists");
            false
        }
        Err(e) => return Err(e),
    };

    let inbound = panel.get_inbound(inbound_id).await?;
    Ok(Provisioned { inbound, created })
}
