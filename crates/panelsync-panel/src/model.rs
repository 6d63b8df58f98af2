//! Typed view of panel data.
//!
//! Everything here is produced once at the client boundary (see `wire`);
//! nothing downstream touches raw panel JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Client key on a panel: `{userId}#{inboundId}`.
///
/// Stored in the panel's `email` field. Unique per user per inbound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(user_id: &str, inbound_id: u32) -> Self {
        Self(format!("{user_id}#{inbound_id}"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The user id part (everything before the last `#`).
    pub fn user_id(&self) -> &str {
        self.0.rsplit_once('#').map_or(&self.0, |(user, _)| user)
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A client entry inside an inbound.
///
/// `total_bytes == 0` means unlimited, `expiry_ms == 0` means never.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub uuid: String,
    pub email: String,
    pub enabled: bool,
    pub total_bytes: u64,
    pub expiry_ms: i64,
    pub sub_id: String,
    /// Owner id as understood by the panel's Telegram integration.
    pub tg_id: String,
    pub flow: String,
    pub limit_ip: u32,
    pub reset_days: u32,
}

impl ClientRecord {
    /// Whether this record belongs to `identity`.
    #[inline]
    pub fn is(&self, identity: &ClientIdentity) -> bool {
        self.email == identity.as_str()
    }
}

/// Per-client counters as reported by one panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficSample {
    pub uploaded: u64,
    pub downloaded: u64,
    pub total_bytes: u64,
    pub expiry_ms: i64,
}

impl TrafficSample {
    #[inline]
    pub fn used(&self) -> u64 {
        self.uploaded.saturating_add(self.downloaded)
    }
}

/// How often a panel zeroes an inbound's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResetInterval {
    #[default]
    Never,
    Daily,
    Weekly,
    Monthly,
}

impl ResetInterval {
    /// Parse the panel's `trafficReset` value. Unknown values mean never.
    pub fn from_panel(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            _ => Self::Never,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// Transport discriminant, in the panel's `network` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Tcp,
    Ws,
    Grpc,
    Http,
    XHttp,
}

impl TransportKind {
    pub const ALL: [TransportKind; 5] = [
        TransportKind::Tcp,
        TransportKind::Ws,
        TransportKind::Grpc,
        TransportKind::Http,
        TransportKind::XHttp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ws => "ws",
            Self::Grpc => "grpc",
            Self::Http => "http",
            Self::XHttp => "xhttp",
        }
    }

    pub fn from_network(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// Security discriminant, in the panel's `security` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityKind {
    None,
    Tls,
    Reality,
}

impl SecurityKind {
    pub const ALL: [SecurityKind; 3] = [SecurityKind::None, SecurityKind::Tls, SecurityKind::Reality];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tls => "tls",
            Self::Reality => "reality",
        }
    }

    pub fn from_security(s: &str) -> Option<Self> {
        match s {
            "" | "none" => Some(Self::None),
            "tls" => Some(Self::Tls),
            "reality" => Some(Self::Reality),
            _ => None,
        }
    }
}

/// Transport sub-settings. Absent values are `None`, never empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Tcp {
        /// Header type is `http`.
        http_header: bool,
        /// First non-empty request path of the `http` header.
        http_path: Option<String>,
    },
    Ws {
        path: Option<String>,
        host: Option<String>,
    },
    Grpc {
        service_name: Option<String>,
    },
    Http {
        path: Option<String>,
        host: Option<String>,
    },
    XHttp {
        path: Option<String>,
        mode: Option<String>,
        host: Option<String>,
    },
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Tcp { .. } => TransportKind::Tcp,
            Self::Ws { .. } => TransportKind::Ws,
            Self::Grpc { .. } => TransportKind::Grpc,
            Self::Http { .. } => TransportKind::Http,
            Self::XHttp { .. } => TransportKind::XHttp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    pub server_name: Option<String>,
    pub fingerprint: Option<String>,
    pub alpn: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealitySettings {
    pub public_key: Option<String>,
    pub fingerprint: Option<String>,
    pub server_name: Option<String>,
    pub short_id: Option<String>,
    pub spider_x: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Security {
    None,
    Tls(TlsSettings),
    Reality(RealitySettings),
}

impl Security {
    pub fn kind(&self) -> SecurityKind {
        match self {
            Self::None => SecurityKind::None,
            Self::Tls(_) => SecurityKind::Tls,
            Self::Reality(_) => SecurityKind::Reality,
        }
    }
}

/// Address override published instead of the inbound's own listen address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProxy {
    pub dest: String,
    /// `None` keeps the inbound port.
    pub port: Option<u16>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub transport: Transport,
    pub security: Security,
    pub external_proxies: Vec<ExternalProxy>,
}

/// An inbound channel on a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundConfig {
    pub id: u32,
    pub remark: String,
    pub protocol: String,
    pub enabled: bool,
    pub listen: String,
    pub port: u16,
    pub clients: Vec<ClientRecord>,
    /// `Err` carries why `streamSettings` could not be decoded. Clients and
    /// reset data are usable either way; only the link is lost.
    pub stream: Result<StreamSettings, String>,
    pub reset_interval: ResetInterval,
    /// Last counter reset, ms since epoch (0 = never).
    pub last_reset_ms: i64,
}

impl InboundConfig {
    pub fn find_client(&self, identity: &ClientIdentity) -> Option<&ClientRecord> {
        self.clients.iter().find(|c| c.is(identity))
    }

    pub fn find_client_by_email(&self, email: &str) -> Option<&ClientRecord> {
        self.clients.iter().find(|c| c.email == email)
    }
}
