//! `vless://` URI construction from a typed inbound.

use std::net::IpAddr;

use percent_encoding::utf8_percent_encode;

use panelsync_panel::{
    InboundConfig, Security, SecurityKind, StreamSettings, Transport, TransportKind,
};

use crate::encode::{FRAGMENT, QUERY_VALUE};

/// Ordered, non-empty query parameters.
#[derive(Debug, Default)]
pub(crate) struct Query {
    pairs: Vec<(&'static str, String)>,
}

impl Query {
    /// Append `key=value` unless the value is absent or empty.
    fn push(&mut self, key: &'static str, value: Option<&str>) {
        if let Some(v) = value
            && !v.is_empty()
        {
            self.pairs.push((key, v.to_string()));
        }
    }

    fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, QUERY_VALUE)))
            .collect::<Vec<_>>()
            .join("&")
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<&'static str> {
        self.pairs.iter().map(|(k, _)| *k).collect()
    }
}

type SecurityWriter = fn(&Security, &mut Query);
type TransportWriter = fn(&Transport, &mut Query);

/// Security parameter writers, one per security kind.
const SECURITY_WRITERS: [(SecurityKind, SecurityWriter); 3] = [
    (SecurityKind::None, write_no_security),
    (SecurityKind::Tls, write_tls),
    (SecurityKind::Reality, write_reality),
];

/// Transport parameter writers, one per network.
const TRANSPORT_WRITERS: [(TransportKind, TransportWriter); 5] = [
    (TransportKind::Tcp, write_tcp),
    (TransportKind::Ws, write_ws),
    (TransportKind::Grpc, write_grpc),
    (TransportKind::Http, write_http),
    (TransportKind::XHttp, write_xhttp),
];

fn security_writer(kind: SecurityKind) -> SecurityWriter {
    SECURITY_WRITERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(write_no_security, |(_, w)| *w)
}

fn transport_writer(kind: TransportKind) -> TransportWriter {
    TRANSPORT_WRITERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(write_nothing, |(_, w)| *w)
}

fn write_no_security(_: &Security, _: &mut Query) {}

fn write_nothing(_: &Transport, _: &mut Query) {}

fn write_tls(security: &Security, q: &mut Query) {
    let Security::Tls(tls) = security else { return };
    q.push("sni", tls.server_name.as_deref());
    q.push("fp", tls.fingerprint.as_deref());
    if !tls.alpn.is_empty() {
        q.push("alpn", Some(&tls.alpn.join(",")));
    }
}

fn write_reality(security: &Security, q: &mut Query) {
    let Security::Reality(r) = security else { return };
    q.push("pbk", r.public_key.as_deref());
    q.push("fp", r.fingerprint.as_deref());
    q.push("sni", r.server_name.as_deref());
    q.push("sid", r.short_id.as_deref());
    q.push("spx", r.spider_x.as_deref());
}

fn write_tcp(transport: &Transport, q: &mut Query) {
    let Transport::Tcp {
        http_header,
        http_path,
    } = transport
    else {
        return;
    };
    if *http_header {
        q.push("headerType", Some("http"));
        q.push("path", http_path.as_deref());
    }
}

fn write_ws(transport: &Transport, q: &mut Query) {
    let Transport::Ws { path, host } = transport else { return };
    q.push("path", path.as_deref());
    q.push("host", host.as_deref());
}

fn write_grpc(transport: &Transport, q: &mut Query) {
    let Transport::Grpc { service_name } = transport else { return };
    q.push("serviceName", service_name.as_deref());
}

fn write_http(transport: &Transport, q: &mut Query) {
    let Transport::Http { path, host } = transport else { return };
    q.push("path", path.as_deref());
    q.push("host", host.as_deref());
}

fn write_xhttp(transport: &Transport, q: &mut Query) {
    let Transport::XHttp { path, mode, host } = transport else { return };
    q.push("path", path.as_deref());
    q.push("mode", mode.as_deref());
    q.push("host", host.as_deref());
}

/// Build the query string for a stream: base, security, then transport.
pub(crate) fn stream_query(stream: &StreamSettings) -> Query {
    let mut q = Query::default();
    q.push("encryption", Some("none"));
    let security = stream.security.kind();
    if security != SecurityKind::None {
        q.push("security", Some(security.as_str()));
    }
    security_writer(security)(&stream.security, &mut q);
    let transport = stream.transport.kind();
    q.push("type", Some(transport.as_str()));
    transport_writer(transport)(&stream.transport, &mut q);
    q
}

/// Listen addresses that are never reachable from a client.
fn is_unroutable(addr: &str) -> bool {
    if addr.is_empty() || addr.eq_ignore_ascii_case("localhost") {
        return true;
    }
    match addr.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || ip.is_unspecified(),
        Err(_) => false,
    }
}

/// Pick the published address and port.
///
/// Order: first external proxy, then the inbound listen address, then the
/// caller's fallback host.
pub fn resolve_endpoint(inbound: &InboundConfig, fallback_host: Option<&str>) -> Option<(String, u16)> {
    let proxy = inbound
        .stream
        .as_ref()
        .ok()
        .and_then(|s| s.external_proxies.first());
    let (host, port) = match proxy {
        Some(proxy) => (proxy.dest.as_str(), proxy.port.unwrap_or(inbound.port)),
        None if !is_unroutable(inbound.listen.trim()) => (inbound.listen.trim(), inbound.port),
        None => (fallback_host.filter(|h| !is_unroutable(h))?, inbound.port),
    };
    if port == 0 {
        return None;
    }
    Some((host.to_string(), port))
}

/// Bracket bare IPv6 literals for use in a URI authority.
fn authority_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

/// Build a `vless://` link for `client_uuid` on `inbound`.
///
/// Returns `None` when the inbound is not vless, when its stream settings
/// could not be decoded, or when the address, port or uuid cannot be
/// resolved.
pub fn build_link(
    inbound: &InboundConfig,
    client_uuid: &str,
    user_id: &str,
    fallback_host: Option<&str>,
) -> Option<String> {
    if !inbound.protocol.eq_ignore_ascii_case("vless") || client_uuid.trim().is_empty() {
        return None;
    }
    let stream = inbound.stream.as_ref().ok()?;
    let (host, port) = resolve_endpoint(inbound, fallback_host)?;
    let query = stream_query(stream).encode();
    let label = if inbound.remark.trim().is_empty() {
        format!("Config-{user_id}")
    } else {
        inbound.remark.clone()
    };
    Some(format!(
        "vless://{client_uuid}@{}:{port}?{query}#{}",
        authority_host(&host),
        utf8_percent_encode(&label, FRAGMENT)
    ))
}

#[cfg(test)]
mod tests {
    use panelsync_panel::{ExternalProxy, RealitySettings, ResetInterval, TlsSettings};

    use super::*;

    fn inbound(transport: Transport, security: Security) -> InboundConfig {
        InboundConfig {
            id: 1,
            remark: "DE ws".into(),
            protocol: "vless".into(),
            enabled: true,
            listen: "203.0.113.7".into(),
            port: 443,
            clients: Vec::new(),
            stream: Ok(StreamSettings {
                transport,
                security,
                external_proxies: Vec::new(),
            }),
            reset_interval: ResetInterval::Never,
            last_reset_ms: 0,
        }
    }

    fn tcp() -> Transport {
        Transport::Tcp {
            http_header: false,
            http_path: None,
        }
    }

    fn proxies(cfg: &mut InboundConfig) -> &mut Vec<ExternalProxy> {
        &mut cfg.stream.as_mut().unwrap().external_proxies
    }

    #[test]
    fn every_kind_has_a_writer() {
        for kind in SecurityKind::ALL {
            assert!(SECURITY_WRITERS.iter().any(|(k, _)| *k == kind), "{kind:?}");
        }
        for kind in TransportKind::ALL {
            assert!(TRANSPORT_WRITERS.iter().any(|(k, _)| *k == kind), "{kind:?}");
        }
    }

    #[test]
    fn reality_tcp_parameter_order() {
        let cfg = inbound(
            tcp(),
            Security::Reality(RealitySettings {
                public_key: Some("PBK".into()),
                fingerprint: Some("chrome".into()),
                server_name: Some("www.example.com".into()),
                short_id: Some("ab12".into()),
                spider_x: Some("/".into()),
            }),
        );
        let q = stream_query(cfg.stream.as_ref().unwrap());
        assert_eq!(
            q.keys(),
            ["encryption", "security", "pbk", "fp", "sni", "sid", "spx", "type"]
        );
        let link = build_link(&cfg, "uuid-1", "42", None).unwrap();
        assert_eq!(
            link,
            "vless://uuid-1@203.0.113.7:443?encryption=none&security=reality&pbk=PBK&fp=chrome\
             &sni=www.example.com&sid=ab12&spx=%2F&type=tcp#DE%20ws"
        );
    }

    #[test]
    fn tls_ws_with_alpn() {
        let cfg = inbound(
            Transport::Ws {
                path: Some("/ray?ed=2048".into()),
                host: Some("cdn.example.com".into()),
            },
            Security::Tls(TlsSettings {
                server_name: Some("cdn.example.com".into()),
                fingerprint: None,
                alpn: vec!["h2".into(), "http/1.1".into()],
            }),
        );
        let link = build_link(&cfg, "u", "42", None).unwrap();
        assert!(link.contains("security=tls&sni=cdn.example.com&alpn=h2%2Chttp%2F1.1&type=ws"));
        assert!(link.contains("path=%2Fray%3Fed%3D2048&host=cdn.example.com"));
        assert!(!link.contains("fp="));
    }

    #[test]
    fn tcp_http_header() {
        let cfg = inbound(
            Transport::Tcp {
                http_header: true,
                http_path: Some("/video".into()),
            },
            Security::None,
        );
        let link = build_link(&cfg, "u", "42", None).unwrap();
        assert!(link.ends_with("?encryption=none&type=tcp&headerType=http&path=%2Fvideo#DE%20ws"));
    }

    #[test]
    fn tcp_http_header_without_path() {
        let cfg = inbound(
            Transport::Tcp {
                http_header: true,
                http_path: None,
            },
            Security::None,
        );
        let link = build_link(&cfg, "u", "42", None).unwrap();
        assert!(link.ends_with("?encryption=none&type=tcp&headerType=http#DE%20ws"), "{link}");
    }

    #[test]
    fn undecoded_stream_has_no_link() {
        let mut cfg = inbound(tcp(), Security::None);
        cfg.stream = Err("unsupported network 'httpupgrade'".into());
        assert_eq!(build_link(&cfg, "u", "42", Some("de1.example.com")), None);
    }

    #[test]
    fn empty_fields_are_omitted() {
        let cfg = inbound(
            Transport::XHttp {
                path: Some("/x".into()),
                mode: None,
                host: None,
            },
            Security::Tls(TlsSettings::default()),
        );
        let link = build_link(&cfg, "u", "42", None).unwrap();
        assert!(link.contains("security=tls&type=xhttp&path=%2Fx#"));
        assert!(!link.contains("=&"));
        assert!(!link.contains("mode="));
    }

    #[test]
    fn external_proxy_overrides_address_and_port() {
        let mut cfg = inbound(Transport::Grpc { service_name: Some("svc".into()) }, Security::None);
        proxies(&mut cfg).push(ExternalProxy {
            dest: "edge.example.com".into(),
            port: Some(8443),
            remark: None,
        });
        let link = build_link(&cfg, "u", "42", None).unwrap();
        assert!(link.starts_with("vless://u@edge.example.com:8443?"));
        assert!(link.contains("type=grpc&serviceName=svc"));

        proxies(&mut cfg)[0].port = None;
        let link = build_link(&cfg, "u", "42", None).unwrap();
        assert!(link.starts_with("vless://u@edge.example.com:443?"));
    }

    #[test]
    fn unroutable_listen_uses_fallback_or_none() {
        for listen in ["", "0.0.0.0", "127.0.0.1", "::", "localhost"] {
            let mut cfg = inbound(tcp(), Security::None);
            cfg.listen = listen.into();
            assert_eq!(build_link(&cfg, "u", "42", None), None, "{listen}");
            let link = build_link(&cfg, "u", "42", Some("de1.example.com")).unwrap();
            assert!(link.starts_with("vless://u@de1.example.com:443?"), "{listen}");
        }
    }

    #[test]
    fn ipv6_listen_is_bracketed() {
        let mut cfg = inbound(tcp(), Security::None);
        cfg.listen = "2001:db8::1".into();
        let link = build_link(&cfg, "u", "42", None).unwrap();
        assert!(link.starts_with("vless://u@[2001:db8::1]:443?"));
    }

    #[test]
    fn missing_uuid_port_or_wrong_protocol() {
        let cfg = inbound(tcp(), Security::None);
        assert_eq!(build_link(&cfg, "", "42", None), None);

        let mut no_port = cfg.clone();
        no_port.port = 0;
        assert_eq!(build_link(&no_port, "u", "42", None), None);

        let mut trojan = cfg;
        trojan.protocol = "trojan".into();
        assert_eq!(build_link(&trojan, "u", "42", None), None);
    }

    #[test]
    fn empty_remark_gets_default_label() {
        let mut cfg = inbound(tcp(), Security::None);
        cfg.remark = String::new();
        let link = build_link(&cfg, "u", "42", None).unwrap();
        assert!(link.ends_with("#Config-42"));
    }
}
