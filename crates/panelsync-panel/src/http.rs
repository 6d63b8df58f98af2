//! HTTP panel client.
//!
//! Talks to a 3X-UI panel's JSON API over a cookie-backed session.
//!
//! # Example
//!
//! ```no_run
//! use panelsync_panel::{HttpPanel, PanelApi};
//!
//! # async fn example() -> Result<(), panelsync_panel::PanelError> {
//! let panel = HttpPanel::new("de-1", "https://de1.example.com:2053/secret/", "admin", "pw")?;
//! panel.login().await?;
//! let inbound = panel.get_inbound(1).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use panelsync_config::{PanelConfig, ServerTarget};

use crate::error::PanelError;
use crate::model::{ClientIdentity, ClientRecord, InboundConfig, TrafficSample};
use crate::traits::PanelApi;
use crate::wire;

/// Characters left as-is in a path segment (RFC 3986 unreserved).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// HTTP client bound to one panel.
#[derive(Debug)]
pub struct HttpPanel {
    client: Client,
    name: String,
    base: String,
    username: String,
    password: String,
}

impl HttpPanel {
    /// Create a client with default timeouts.
    ///
    /// `base_url` is the panel URL including its web base path.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, PanelError> {
        let client = build_client(
            Duration::from_secs(panelsync_core::DEFAULT_PANEL_CALL_TIMEOUT_SECS),
            Duration::from_secs(panelsync_core::DEFAULT_PANEL_CONNECT_TIMEOUT_SECS),
            false,
        )?;
        Ok(Self::with_client(client, name, base_url, username, password))
    }

    /// Create from a configured server, honoring timeouts and TLS settings.
    pub fn from_target(target: &ServerTarget, panel: &PanelConfig) -> Result<Self, PanelError> {
        let client = build_client(
            Duration::from_secs(panel.call_timeout_secs),
            Duration::from_secs(panel.connect_timeout_secs),
            target.insecure_skip_verify,
        )?;
        let (username, password) = target.credentials(panel);
        Ok(Self::with_client(
            client,
            target.name.clone(),
            target.base_url(),
            username,
            password,
        ))
    }

    /// Create with a custom reqwest [`Client`].
    ///
    /// The client must have a cookie store, or every call after login will
    /// be unauthenticated.
    pub fn with_client(
        client: Client,
        name: impl Into<String>,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base = base_url.into();
        let base = format!("{}/", base.trim_end_matches('/'));
        Self {
            client,
            name: name.into(),
            base,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Server name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        form: Option<&[(&str, String)]>,
    ) -> Result<Response, PanelError> {
        let mut req = self
            .client
            .request(method.clone(), self.url(path))
            .header("Accept", "application/json");
        if let Some(form) = form {
            req = req.form(form);
        }
        Ok(req.send().await?)
    }

    /// Send a request, re-logging in once if the session has expired.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, String)]>,
    ) -> Result<wire::Envelope<T>, PanelError> {
        let mut resp = self.send_once(&method, path, form).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            debug!(server = %self.name, path, "session expired, logging in again");
            self.login().await?;
            resp = self.send_once(&method, path, form).await?;
            if resp.status() == StatusCode::UNAUTHORIZED {
                return Err(PanelError::Auth(format!(
                    "{}: session rejected after re-login",
                    self.name
                )));
            }
        }
        decode(resp).await
    }
}

fn build_client(
    timeout: Duration,
    connect_timeout: Duration,
    insecure: bool,
) -> Result<Client, PanelError> {
    Client::builder()
        .user_agent(panelsync_core::user_agent())
        .cookie_store(true)
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(PanelError::transport)
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<wire::Envelope<T>, PanelError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(PanelError::NotFound(format!("HTTP {}", status.as_u16())));
    }
    if !status.is_success() {
        return Err(PanelError::Transport(format!("HTTP {}", status.as_u16())));
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(PanelError::decode)
}

/// Map a `success: false` envelope to the matching error.
fn rejection(msg: String) -> PanelError {
    let lower = msg.to_ascii_lowercase();
    if lower.contains("duplicate") || lower.contains("already exist") {
        PanelError::Conflict(msg)
    } else if lower.contains("not found") {
        PanelError::NotFound(msg)
    } else {
        PanelError::Rejected(msg)
    }
}

fn ensure_success<T>(envelope: wire::Envelope<T>) -> Result<Option<T>, PanelError> {
    if envelope.success {
        Ok(envelope.obj)
    } else {
        Err(rejection(envelope.msg))
    }
}

#[async_trait]
impl PanelApi for HttpPanel {
    async fn login(&self) -> Result<(), PanelError> {
        let form = [
            ("username", self.username.clone()),
            ("password", self.password.clone()),
        ];
        let resp = self.send_once(&Method::POST, "login", Some(&form)).await?;
        if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(PanelError::Auth(format!(
                "{}: HTTP {}",
                self.name,
                resp.status().as_u16()
            )));
        }
        let envelope: wire::Envelope<serde_json::Value> = decode(resp).await?;
        if !envelope.success {
            warn!(server = %self.name, msg = %envelope.msg, "panel login rejected");
            return Err(PanelError::Auth(format!("{}: {}", self.name, envelope.msg)));
        }
        debug!(server = %self.name, "panel session established");
        Ok(())
    }

    async fn get_inbound(&self, inbound_id: u32) -> Result<InboundConfig, PanelError> {
        let path = format!("panel/api/inbounds/get/{inbound_id}");
        let envelope: wire::Envelope<wire::Inbound> = self.call(Method::GET, &path, None).await?;
        let inbound = ensure_success(envelope)?
            .ok_or_else(|| PanelError::NotFound(format!("inbound {inbound_id}")))?;
        InboundConfig::try_from(inbound)
    }

    async fn add_client(&self, inbound_id: u32, client: &ClientRecord) -> Result<(), PanelError> {
        let form = [
            ("id", inbound_id.to_string()),
            ("settings", wire::clients_settings(client)?),
        ];
        let envelope: wire::Envelope<serde_json::Value> = self
            .call(Method::POST, "panel/api/inbounds/addClient", Some(&form))
            .await?;
        ensure_success(envelope).map(drop)
    }

    async fn update_client(
        &self,
        inbound_id: u32,
        client: &ClientRecord,
    ) -> Result<(), PanelError> {
        let path = format!(
            "panel/api/inbounds/updateClient/{}",
            utf8_percent_encode(&client.uuid, PATH_SEGMENT)
        );
        let form = [
            ("id", inbound_id.to_string()),
            ("settings", wire::clients_settings(client)?),
        ];
        let envelope: wire::Envelope<serde_json::Value> =
            self.call(Method::POST, &path, Some(&form)).await?;
        ensure_success(envelope).map(drop)
    }

    async fn delete_client(&self, inbound_id: u32, client_uuid: &str) -> Result<(), PanelError> {
        let path = format!(
            "panel/api/inbounds/{inbound_id}/delClient/{}",
            utf8_percent_encode(client_uuid, PATH_SEGMENT)
        );
        let envelope: wire::Envelope<serde_json::Value> =
            self.call(Method::POST, &path, None).await?;
        match ensure_success(envelope) {
            Ok(_) | Err(PanelError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn get_traffic(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Option<TrafficSample>, PanelError> {
        let path = format!(
            "panel/api/inbounds/getClientTraffics/{}",
            utf8_percent_encode(identity.as_str(), PATH_SEGMENT)
        );
        let envelope: wire::Envelope<wire::ClientTraffic> =
            self.call(Method::GET, &path, None).await?;
        Ok(ensure_success(envelope)?.map(Into::into))
    }
}
