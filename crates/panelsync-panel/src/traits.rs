//! Panel API trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PanelError;
use crate::model::{ClientIdentity, ClientRecord, InboundConfig, TrafficSample};

/// Operations on a single panel.
///
/// One instance talks to one server. Implementations must be thread-safe
/// (`Send + Sync`): a pass shares one session between many user tasks.
#[async_trait]
pub trait PanelApi: Send + Sync {
    /// Establish (or refresh) the session.
    async fn login(&self) -> Result<(), PanelError>;

    /// Fetch an inbound with its clients and stream settings.
    async fn get_inbound(&self, inbound_id: u32) -> Result<InboundConfig, PanelError>;

    /// Create a client. Returns [`PanelError::Conflict`] if the email exists.
    async fn add_client(&self, inbound_id: u32, client: &ClientRecord) -> Result<(), PanelError>;

    /// Replace an existing client, matched by uuid.
    async fn update_client(&self, inbound_id: u32, client: &ClientRecord)
    -> Result<(), PanelError>;

    /// Delete a client by uuid. Deleting an absent client succeeds.
    async fn delete_client(&self, inbound_id: u32, client_uuid: &str) -> Result<(), PanelError>;

    /// Read traffic counters. `Ok(None)` means the panel has no row for
    /// this client, which is not the same as a failed read.
    async fn get_traffic(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Option<TrafficSample>, PanelError>;

    /// Set a client's quota and expiry, keeping everything else.
    async fn edit_client(
        &self,
        inbound_id: u32,
        email: &str,
        total_bytes: u64,
        expiry_ms: i64,
    ) -> Result<ClientRecord, PanelError> {
        let inbound = self.get_inbound(inbound_id).await?;
        let mut client = inbound
            .find_client_by_email(email)
            .cloned()
            .ok_or_else(|| PanelError::NotFound(format!("client {email}")))?;
        client.total_bytes = total_bytes;
        client.expiry_ms = expiry_ms;
        self.update_client(inbound_id, &client).await?;
        Ok(client)
    }

    /// Delete a client by email. Returns whether a client was present.
    async fn remove_client(&self, inbound_id: u32, email: &str) -> Result<bool, PanelError> {
        let inbound = self.get_inbound(inbound_id).await?;
        match inbound.find_client_by_email(email) {
            Some(client) => {
                self.delete_client(inbound_id, &client.uuid).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Blanket implementation for `Arc<P>` where `P: PanelApi`.
#[async_trait]
impl<P: PanelApi + ?Sized> PanelApi for Arc<P> {
    #[inline]
    async fn login(&self) -> Result<(), PanelError> {
        (**self).login().await
    }

    #[inline]
    async fn get_inbound(&self, inbound_id: u32) -> Result<InboundConfig, PanelError> {
        (**self).get_inbound(inbound_id).await
    }

    #[inline]
    async fn add_client(&self, inbound_id: u32, client: &ClientRecord) -> Result<(), PanelError> {
        (**self).add_client(inbound_id, client).await
    }

    #[inline]
    async fn update_client(
        &self,
        inbound_id: u32,
        client: &ClientRecord,
    ) -> Result<(), PanelError> {
        (**self).update_client(inbound_id, client).await
    }

    #[inline]
    async fn delete_client(&self, inbound_id: u32, client_uuid: &str) -> Result<(), PanelError> {
        (**self).delete_client(inbound_id, client_uuid).await
    }

    #[inline]
    async fn get_traffic(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Option<TrafficSample>, PanelError> {
        (**self).get_traffic(identity).await
    }
}

/// Blanket implementation for `Box<P>` where `P: PanelApi`.
#[async_trait]
impl<P: PanelApi + ?Sized> PanelApi for Box<P> {
    #[inline]
    async fn login(&self) -> Result<(), PanelError> {
        (**self).login().await
    }

    #[inline]
    async fn get_inbound(&self, inbound_id: u32) -> Result<InboundConfig, PanelError> {
        (**self).get_inbound(inbound_id).await
    }

    #[inline]
    async fn add_client(&self, inbound_id: u32, client: &ClientRecord) -> Result<(), PanelError> {
        (**self).add_client(inbound_id, client).await
    }

    #[inline]
    async fn update_client(
        &self,
        inbound_id: u32,
        client: &ClientRecord,
    ) -> Result<(), PanelError> {
        (**self).update_client(inbound_id, client).await
    }

    #[inline]
    async fn delete_client(&self, inbound_id: u32, client_uuid: &str) -> Result<(), PanelError> {
        (**self).delete_client(inbound_id, client_uuid).await
    }

    #[inline]
    async fn get_traffic(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Option<TrafficSample>, PanelError> {
        (**self).get_traffic(identity).await
    }
}
