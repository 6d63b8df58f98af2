//! 3X-UI wire types and their conversion into the typed model.
//!
//! Inbound `settings` and `streamSettings` arrive as JSON documents encoded
//! inside JSON strings. They are decoded exactly once, here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PanelError;
use crate::model::{
    ClientRecord, ExternalProxy, InboundConfig, RealitySettings, ResetInterval, Security,
    SecurityKind, StreamSettings, TlsSettings, TrafficSample, Transport, TransportKind,
};

/// Standard response envelope: `{success, msg, obj}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub msg: String,
    pub obj: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Inbound {
    pub id: u32,
    #[serde(default)]
    pub remark: String,
    #[serde(default = "yes")]
    pub enable: bool,
    #[serde(default)]
    pub listen: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub settings: String,
    #[serde(default)]
    pub stream_settings: String,
    #[serde(default)]
    pub traffic_reset: String,
    #[serde(default)]
    pub last_traffic_reset_time: i64,
}

#[derive(Debug, Default, Deserialize)]
struct InboundSettings {
    #[serde(default)]
    clients: Vec<Client>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Client {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "yes")]
    pub enable: bool,
    #[serde(default)]
    pub tg_id: Value,
    #[serde(rename = "totalGB", default)]
    pub total_gb: i64,
    #[serde(default)]
    pub expiry_time: i64,
    #[serde(default)]
    pub sub_id: String,
    #[serde(default)]
    pub reset: i64,
    #[serde(default)]
    pub flow: String,
    #[serde(default)]
    pub limit_ip: i64,
}

/// Body of `settings` for addClient/updateClient.
#[derive(Debug, Serialize)]
pub(crate) struct ClientsPayload<'a> {
    pub clients: [&'a Client; 1],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClientTraffic {
    #[serde(default)]
    pub up: i64,
    #[serde(default)]
    pub down: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub expiry_time: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stream {
    #[serde(default)]
    network: String,
    #[serde(default)]
    security: String,
    #[serde(default)]
    external_proxy: Vec<WireExternalProxy>,
    #[serde(default)]
    tcp_settings: Option<TcpSettings>,
    #[serde(default)]
    ws_settings: Option<WsSettings>,
    #[serde(default)]
    grpc_settings: Option<GrpcSettings>,
    #[serde(default)]
    http_settings: Option<HttpSettings>,
    #[serde(default)]
    xhttp_settings: Option<XhttpSettings>,
    #[serde(default)]
    tls_settings: Option<WireTls>,
    #[serde(default)]
    reality_settings: Option<WireReality>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireExternalProxy {
    #[serde(default)]
    dest: String,
    #[serde(default)]
    port: Option<i64>,
    #[serde(default)]
    remark: String,
}

#[derive(Debug, Default, Deserialize)]
struct TcpSettings {
    #[serde(default)]
    header: Option<TcpHeader>,
}

#[derive(Debug, Default, Deserialize)]
struct TcpHeader {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    request: Option<TcpRequest>,
}

#[derive(Debug, Default, Deserialize)]
struct TcpRequest {
    #[serde(default)]
    path: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WsSettings {
    #[serde(default)]
    path: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    headers: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrpcSettings {
    #[serde(default)]
    service_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct HttpSettings {
    #[serde(default)]
    path: String,
    #[serde(default)]
    host: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct XhttpSettings {
    #[serde(default)]
    path: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    mode: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTls {
    #[serde(default)]
    server_name: String,
    #[serde(default)]
    alpn: Vec<String>,
    #[serde(default)]
    settings: WireTlsClient,
}

#[derive(Debug, Default, Deserialize)]
struct WireTlsClient {
    #[serde(default)]
    fingerprint: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReality {
    #[serde(default)]
    server_names: Vec<String>,
    #[serde(default)]
    short_ids: Vec<String>,
    #[serde(default)]
    settings: WireRealityClient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRealityClient {
    #[serde(default)]
    public_key: String,
    #[serde(default)]
    fingerprint: String,
    #[serde(default)]
    spider_x: String,
}

fn yes() -> bool {
    true
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

fn first(values: Vec<String>) -> Option<String> {
    values.into_iter().find_map(non_empty)
}

/// Header values are either a string or a list of strings.
fn header_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s.clone()),
        Value::Array(items) => items
            .iter()
            .find_map(|v| v.as_str().and_then(|s| non_empty(s.to_string()))),
        _ => None,
    }
}

fn clamp_u64(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

// ── Wire → model ──────────────────────────────────────────────────

impl TryFrom<Inbound> for InboundConfig {
    type Error = PanelError;

    fn try_from(w: Inbound) -> Result<Self, Self::Error> {
        let settings: InboundSettings = if w.settings.trim().is_empty() {
            InboundSettings::default()
        } else {
            serde_json::from_str(&w.settings)
                .map_err(|e| PanelError::Decode(format!("inbound {} settings: {e}", w.id)))?
        };
        let stream = decode_stream(&w.stream_settings)
            .map_err(|e| format!("inbound {} streamSettings: {e}", w.id));

        Ok(Self {
            id: w.id,
            remark: w.remark,
            protocol: w.protocol,
            enabled: w.enable,
            listen: w.listen,
            port: w.port,
            clients: settings.clients.into_iter().map(Into::into).collect(),
            stream,
            reset_interval: ResetInterval::from_panel(&w.traffic_reset),
            last_reset_ms: w.last_traffic_reset_time,
        })
    }
}

fn decode_stream(raw: &str) -> Result<StreamSettings, String> {
    let stream: Stream = if raw.trim().is_empty() {
        Stream::default()
    } else {
        serde_json::from_str(raw).map_err(|e| e.to_string())?
    };
    parse_stream(stream)
}

fn parse_stream(s: Stream) -> Result<StreamSettings, String> {
    let network = if s.network.is_empty() { "tcp" } else { s.network.as_str() };
    let kind = TransportKind::from_network(network)
        .ok_or_else(|| format!("unsupported network '{network}'"))?;
    let transport = match kind {
        TransportKind::Tcp => {
            let header = s.tcp_settings.and_then(|t| t.header);
            let (http_header, http_path) = match header {
                Some(h) if h.kind == "http" => (true, h.request.and_then(|r| first(r.path))),
                _ => (false, None),
            };
            Transport::Tcp {
                http_header,
                http_path,
            }
        }
        TransportKind::Ws => {
            let ws = s.ws_settings.unwrap_or_default();
            let host = non_empty(ws.host).or_else(|| {
                ws.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("host"))
                    .and_then(|(_, v)| header_value(v))
            });
            Transport::Ws {
                path: non_empty(ws.path),
                host,
            }
        }
        TransportKind::Grpc => Transport::Grpc {
            service_name: s.grpc_settings.and_then(|g| non_empty(g.service_name)),
        },
        TransportKind::Http => {
            let http = s.http_settings.unwrap_or_default();
            Transport::Http {
                path: non_empty(http.path),
                host: first(http.host),
            }
        }
        TransportKind::XHttp => {
            let x = s.xhttp_settings.unwrap_or_default();
            Transport::XHttp {
                path: non_empty(x.path),
                mode: non_empty(x.mode),
                host: non_empty(x.host),
            }
        }
    };

    let security_kind = SecurityKind::from_security(&s.security)
        .ok_or_else(|| format!("unsupported security '{}'", s.security))?;
    let security = match security_kind {
        SecurityKind::None => Security::None,
        SecurityKind::Tls => {
            let tls = s.tls_settings.unwrap_or_default();
            Security::Tls(TlsSettings {
                server_name: non_empty(tls.server_name),
                fingerprint: non_empty(tls.settings.fingerprint),
                alpn: tls.alpn.into_iter().filter_map(non_empty).collect(),
            })
        }
        SecurityKind::Reality => {
            let r = s.reality_settings.unwrap_or_default();
            Security::Reality(RealitySettings {
                public_key: non_empty(r.settings.public_key),
                fingerprint: non_empty(r.settings.fingerprint),
                server_name: first(r.server_names),
                short_id: first(r.short_ids),
                spider_x: non_empty(r.settings.spider_x),
            })
        }
    };

    let external_proxies = s
        .external_proxy
        .into_iter()
        .filter_map(|p| {
            let dest = non_empty(p.dest)?;
            Some(ExternalProxy {
                dest,
                port: p.port.and_then(|v| u16::try_from(v).ok()).filter(|v| *v != 0),
                remark: non_empty(p.remark),
            })
        })
        .collect();

    Ok(StreamSettings {
        transport,
        security,
        external_proxies,
    })
}

impl From<Client> for ClientRecord {
    fn from(w: Client) -> Self {
        let tg_id = match w.tg_id {
            Value::String(s) => s,
            Value::Number(n) if n.as_i64() != Some(0) => n.to_string(),
            _ => String::new(),
        };
        Self {
            uuid: w.id,
            email: w.email,
            enabled: w.enable,
            total_bytes: clamp_u64(w.total_gb),
            expiry_ms: w.expiry_time,
            sub_id: w.sub_id,
            tg_id,
            flow: w.flow,
            limit_ip: u32::try_from(w.limit_ip).unwrap_or(0),
            reset_days: u32::try_from(w.reset).unwrap_or(0),
        }
    }
}

impl From<ClientTraffic> for TrafficSample {
    fn from(w: ClientTraffic) -> Self {
        Self {
            uploaded: clamp_u64(w.up),
            downloaded: clamp_u64(w.down),
            total_bytes: clamp_u64(w.total),
            expiry_ms: w.expiry_time,
        }
    }
}

// ── Model → wire ──────────────────────────────────────────────────

impl From<&ClientRecord> for Client {
    fn from(c: &ClientRecord) -> Self {
        // Numeric ids go out as numbers; newer panels type tgId as int64.
        let tg_id = match c.tg_id.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) if c.tg_id.is_empty() => Value::from(0),
            Err(_) => Value::from(c.tg_id.clone()),
        };
        Self {
            id: c.uuid.clone(),
            email: c.email.clone(),
            enable: c.enabled,
            tg_id,
            total_gb: i64::try_from(c.total_bytes).unwrap_or(i64::MAX),
            expiry_time: c.expiry_ms,
            sub_id: c.sub_id.clone(),
            reset: i64::from(c.reset_days),
            flow: c.flow.clone(),
            limit_ip: i64::from(c.limit_ip),
        }
    }
}

/// Encode a client as the `settings` form field expected by add/update.
pub(crate) fn clients_settings(client: &ClientRecord) -> Result<String, PanelError> {
    let wire = Client::from(client);
    serde_json::to_string(&ClientsPayload { clients: [&wire] }).map_err(PanelError::decode)
}
