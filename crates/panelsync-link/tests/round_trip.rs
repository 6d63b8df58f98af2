//! Every transport × security combination produces a link that parses back
//! to the same endpoint, uuid and stream kinds.
#![allow(clippy::tests_outside_test_module)]

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use panelsync_link::build_link;
use panelsync_panel::{
    InboundConfig, RealitySettings, ResetInterval, Security, SecurityKind, StreamSettings,
    TlsSettings, Transport, TransportKind,
};

const UUID: &str = "5f0c1a8e-6d2b-4c1e-9a7f-2e4b8d6c0a13";

// ============================================================================
// Fixtures
// ============================================================================

fn transport(kind: TransportKind) -> Transport {
    match kind {
        TransportKind::Tcp => Transport::Tcp {
            http_header: true,
            http_path: Some("/index.html".into()),
        },
        TransportKind::Ws => Transport::Ws {
            path: Some("/ws".into()),
            host: Some("cdn.example.com".into()),
        },
        TransportKind::Grpc => Transport::Grpc {
            service_name: Some("tunnel".into()),
        },
        TransportKind::Http => Transport::Http {
            path: Some("/h2".into()),
            host: Some("h2.example.com".into()),
        },
        TransportKind::XHttp => Transport::XHttp {
            path: Some("/xh".into()),
            mode: Some("auto".into()),
            host: Some("xh.example.com".into()),
        },
    }
}

fn security(kind: SecurityKind) -> Security {
    match kind {
        SecurityKind::None => Security::None,
        SecurityKind::Tls => Security::Tls(TlsSettings {
            server_name: Some("node.example.com".into()),
            fingerprint: Some("chrome".into()),
            alpn: vec!["h2".into(), "http/1.1".into()],
        }),
        SecurityKind::Reality => Security::Reality(RealitySettings {
            public_key: Some("k1Y2z3".into()),
            fingerprint: Some("firefox".into()),
            server_name: Some("www.microsoft.com".into()),
            short_id: Some("0123abcd".into()),
            spider_x: Some("/".into()),
        }),
    }
}

fn fixture(t: TransportKind, s: SecurityKind) -> InboundConfig {
    InboundConfig {
        id: 9,
        remark: format!("{} {} node", t.as_str(), s.as_str()),
        protocol: "vless".into(),
        enabled: true,
        listen: "198.51.100.20".into(),
        port: 2083,
        clients: Vec::new(),
        stream: Ok(StreamSettings {
            transport: transport(t),
            security: security(s),
            external_proxies: Vec::new(),
        }),
        reset_interval: ResetInterval::Never,
        last_reset_ms: 0,
    }
}

// ============================================================================
// Minimal link parser
// ============================================================================

struct Parsed {
    uuid: String,
    host: String,
    port: u16,
    params: HashMap<String, String>,
    label: String,
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8().unwrap().into_owned()
}

fn parse(link: &str) -> Parsed {
    let rest = link.strip_prefix("vless://").expect("scheme");
    let (rest, fragment) = rest.split_once('#').expect("fragment");
    let (authority, query) = rest.split_once('?').expect("query");
    let (uuid, endpoint) = authority.split_once('@').expect("userinfo");
    let (host, port) = endpoint.rsplit_once(':').expect("port");
    let params = query
        .split('&')
        .map(|pair| {
            let (k, v) = pair.split_once('=').expect("key=value");
            (k.to_string(), decode(v))
        })
        .collect();
    Parsed {
        uuid: uuid.to_string(),
        host: host.to_string(),
        port: port.parse().unwrap(),
        params,
        label: decode(fragment),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn all_combinations_round_trip() {
    for t in TransportKind::ALL {
        for s in SecurityKind::ALL {
            let inbound = fixture(t, s);
            let link = build_link(&inbound, UUID, "42", None)
                .unwrap_or_else(|| panic!("no link for {t:?}/{s:?}"));
            let parsed = parse(&link);

            assert_eq!(parsed.uuid, UUID, "{link}");
            assert_eq!(parsed.host, "198.51.100.20", "{link}");
            assert_eq!(parsed.port, 2083, "{link}");
            assert_eq!(parsed.params["type"], t.as_str(), "{link}");
            assert_eq!(parsed.params["encryption"], "none", "{link}");
            match s {
                SecurityKind::None => assert!(!parsed.params.contains_key("security"), "{link}"),
                _ => assert_eq!(parsed.params["security"], s.as_str(), "{link}"),
            }
            assert_eq!(parsed.label, inbound.remark, "{link}");
            assert!(
                parsed.params.values().all(|v| !v.is_empty()),
                "empty parameter in {link}"
            );
        }
    }
}

#[test]
fn security_parameters_survive_encoding() {
    let link = build_link(
        &fixture(TransportKind::Grpc, SecurityKind::Reality),
        UUID,
        "42",
        None,
    )
    .unwrap();
    let parsed = parse(&link);
    assert_eq!(parsed.params["pbk"], "k1Y2z3");
    assert_eq!(parsed.params["sid"], "0123abcd");
    assert_eq!(parsed.params["spx"], "/");
    assert_eq!(parsed.params["serviceName"], "tunnel");

    let link = build_link(
        &fixture(TransportKind::Tcp, SecurityKind::Tls),
        UUID,
        "42",
        None,
    )
    .unwrap();
    let parsed = parse(&link);
    assert_eq!(parsed.params["alpn"], "h2,http/1.1");
    assert_eq!(parsed.params["headerType"], "http");
    assert_eq!(parsed.params["path"], "/index.html");
}
