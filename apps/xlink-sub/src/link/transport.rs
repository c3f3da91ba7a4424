use serde_json::Value;
use xlink_shared::search_host;

use super::params::ParamSet;

/// Transport tag from `streamSettings.network`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Network {
    Tcp,
    Kcp,
    Ws,
    Grpc,
    HttpUpgrade,
    XHttp,
    Other(String),
}

impl Network {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "tcp" => Network::Tcp,
            "kcp" => Network::Kcp,
            "ws" => Network::Ws,
            "grpc" => Network::Grpc,
            "httpupgrade" => Network::HttpUpgrade,
            "xhttp" => Network::XHttp,
            other => Network::Other(other.to_string()),
        }
    }

    /// Missing or non-string `network` means tcp.
    pub fn from_stream(stream: &Value) -> Self {
        stream
            .get("network")
            .and_then(Value::as_str)
            .map(Self::from_tag)
            .unwrap_or(Network::Tcp)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Network::Tcp => "tcp",
            Network::Kcp => "kcp",
            Network::Ws => "ws",
            Network::Grpc => "grpc",
            Network::HttpUpgrade => "httpupgrade",
            Network::XHttp => "xhttp",
            Network::Other(tag) => tag,
        }
    }
}

/// Transport-level fields a client needs to reach the inbound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportParams {
    pub header_type: Option<String>,
    pub path: Option<String>,
    pub host: Option<String>,
    pub seed: Option<String>,
    pub service_name: Option<String>,
    pub authority: Option<String>,
    pub multi: bool,
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn non_empty(value: &Value, key: &str) -> Option<String> {
    text(value, key).filter(|s| !s.is_empty())
}

impl TransportParams {
    pub fn from_stream(stream: &Value, network: &Network) -> Self {
        let mut params = TransportParams::default();

        match network {
            Network::Tcp => {
                let Some(header) = stream.pointer("/tcpSettings/header") else {
                    return params;
                };
                params.header_type = text(header, "type");
                if params.header_type.as_deref() == Some("http") {
                    if let Some(request) = header.get("request") {
                        params.path = request
                            .get("path")
                            .and_then(Value::as_array)
                            .and_then(|paths| paths.first())
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        params.host = search_host(request.get("headers"));
                    }
                }
            }
            Network::Kcp => {
                if let Some(kcp) = stream.get("kcpSettings") {
                    params.header_type = kcp.get("header").and_then(|h| text(h, "type"));
                    params.seed = text(kcp, "seed");
                }
            }
            Network::Ws => {
                if let Some(ws) = stream.get("wsSettings") {
                    params.path = text(ws, "path");
                    params.host =
                        non_empty(ws, "host").or_else(|| search_host(ws.get("headers")));
                }
            }
            Network::Grpc => {
                if let Some(grpc) = stream.get("grpcSettings") {
                    params.service_name = text(grpc, "serviceName");
                    params.authority = text(grpc, "authority");
                    params.multi = grpc.get("multiMode").and_then(Value::as_bool) == Some(true);
                }
            }
            Network::HttpUpgrade | Network::XHttp => {
                let key = if *network == Network::XHttp {
                    "xhttpSettings"
                } else {
                    "httpupgradeSettings"
                };
                if let Some(settings) = stream.get(key) {
                    params.path = text(settings, "path");
                    params.host = non_empty(settings, "host");
                }
            }
            Network::Other(_) => {}
        }

        params
    }

    fn is_http_disguise(&self) -> bool {
        self.header_type.as_deref() == Some("http")
    }

    /// Query-string keys used by vless, trojan and shadowsocks links.
    pub fn write_query(&self, out: &mut ParamSet, network: &Network) {
        match network {
            Network::Tcp => {
                if self.is_http_disguise() {
                    out.set_opt("path", self.path.as_ref());
                    out.set_opt("host", self.host.as_ref());
                    out.set("headerType", "http");
                }
            }
            Network::Kcp => {
                out.set_opt("headerType", self.header_type.as_ref());
                out.set_opt("seed", self.seed.as_ref());
            }
            Network::Ws | Network::HttpUpgrade | Network::XHttp => {
                out.set_opt("path", self.path.as_ref());
                out.set_opt("host", self.host.as_ref());
            }
            Network::Grpc => {
                out.set_opt("serviceName", self.service_name.as_ref());
                out.set_opt("authority", self.authority.as_ref());
                if self.multi {
                    out.set("mode", "multi");
                }
            }
            Network::Other(_) => {}
        }
    }

    /// Object keys used by the vmess JSON document.
    pub fn write_json(&self, out: &mut ParamSet, network: &Network) {
        match network {
            Network::Tcp => {
                out.set_opt("type", self.header_type.as_ref());
                out.set_opt("path", self.path.as_ref());
                out.set_opt("host", self.host.as_ref());
            }
            Network::Kcp => {
                out.set_opt("type", self.header_type.as_ref());
                out.set_opt("path", self.seed.as_ref());
            }
            Network::Grpc => {
                out.set_opt("path", self.service_name.as_ref());
                out.set_opt("authority", self.authority.as_ref());
                if self.multi {
                    out.set("type", "multi");
                }
            }
            Network::Ws | Network::HttpUpgrade | Network::XHttp => {
                out.set_opt("path", self.path.as_ref());
                out.set_opt("host", self.host.as_ref());
            }
            Network::Other(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(stream: Value) -> (Network, TransportParams) {
        let network = Network::from_stream(&stream);
        let params = TransportParams::from_stream(&stream, &network);
        (network, params)
    }

    #[test]
    fn network_defaults_to_tcp() {
        assert_eq!(Network::from_stream(&json!({})), Network::Tcp);
        assert_eq!(Network::from_stream(&json!({"network": 5})), Network::Tcp);
        assert_eq!(
            Network::from_stream(&json!({"network": "quic"})),
            Network::Other("quic".into())
        );
    }

    #[test]
    fn tcp_http_header() {
        let (network, params) = parse(json!({
            "network": "tcp",
            "tcpSettings": {"header": {
                "type": "http",
                "request": {"path": ["/a", "/b"], "headers": {"Host": ["cdn.example.com"]}}
            }}
        }));
        let mut query = ParamSet::new();
        params.write_query(&mut query, &network);
        assert_eq!(query.to_query(), "headerType=http&host=cdn.example.com&path=%2Fa");

        let mut obj = ParamSet::new();
        params.write_json(&mut obj, &network);
        assert_eq!(obj.get_str("type"), Some("http"));
        assert_eq!(obj.get_str("path"), Some("/a"));
    }

    #[test]
    fn tcp_without_http_header_writes_nothing_to_query() {
        let (network, params) = parse(json!({
            "network": "tcp",
            "tcpSettings": {"header": {"type": "none"}}
        }));
        let mut query = ParamSet::new();
        params.write_query(&mut query, &network);
        assert_eq!(query.to_query(), "");

        let mut obj = ParamSet::new();
        params.write_json(&mut obj, &network);
        assert_eq!(obj.get_str("type"), Some("none"));
    }

    #[test]
    fn kcp_seed() {
        let (network, params) = parse(json!({
            "network": "kcp",
            "kcpSettings": {"header": {"type": "wechat-video"}, "seed": "s3cr3t"}
        }));
        let mut query = ParamSet::new();
        params.write_query(&mut query, &network);
        assert_eq!(query.to_query(), "headerType=wechat-video&seed=s3cr3t");

        let mut obj = ParamSet::new();
        params.write_json(&mut obj, &network);
        assert_eq!(obj.get_str("path"), Some("s3cr3t"));
        assert_eq!(obj.get_str("type"), Some("wechat-video"));
    }

    #[test]
    fn ws_host_prefers_explicit_field() {
        let (_, params) = parse(json!({
            "network": "ws",
            "wsSettings": {"path": "/ws", "host": "a.example", "headers": {"Host": "b.example"}}
        }));
        assert_eq!(params.host.as_deref(), Some("a.example"));

        let (_, params) = parse(json!({
            "network": "ws",
            "wsSettings": {"path": "/ws", "host": "", "headers": {"host": "b.example"}}
        }));
        assert_eq!(params.host.as_deref(), Some("b.example"));
        assert_eq!(params.path.as_deref(), Some("/ws"));
    }

    #[test]
    fn grpc_multi_mode() {
        let (network, params) = parse(json!({
            "network": "grpc",
            "grpcSettings": {"serviceName": "svc", "authority": "auth", "multiMode": true}
        }));
        let mut query = ParamSet::new();
        params.write_query(&mut query, &network);
        assert_eq!(query.to_query(), "authority=auth&mode=multi&serviceName=svc");

        let mut obj = ParamSet::new();
        params.write_json(&mut obj, &network);
        assert_eq!(obj.get_str("path"), Some("svc"));
        assert_eq!(obj.get_str("type"), Some("multi"));
    }

    #[test]
    fn xhttp_skips_empty_host() {
        let (network, params) = parse(json!({
            "network": "xhttp",
            "xhttpSettings": {"path": "/x", "host": ""}
        }));
        let mut query = ParamSet::new();
        params.write_query(&mut query, &network);
        assert_eq!(query.to_query(), "path=%2Fx");
    }

    #[test]
    fn mistyped_fields_are_absent() {
        let (_, params) = parse(json!({
            "network": "ws",
            "wsSettings": {"path": 42, "headers": "nope"}
        }));
        assert_eq!(params, TransportParams::default());

        let (_, params) = parse(json!({"network": "grpc"}));
        assert_eq!(params, TransportParams::default());
    }
}
