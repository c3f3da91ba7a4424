//! Rendering of share links for vmess, vless, trojan and shadowsocks inbounds.

pub mod external_proxy;
pub mod params;
pub mod remark;
pub mod security;
pub mod transport;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use serde_json::Value;
use std::fmt::Write as _;
use tracing::debug;
use xlink_db::models::inbound::{Client, Inbound, Protocol};

use external_proxy::ExternalProxy;
use params::{ParamSet, TLS_IDENTITY_KEYS};
use remark::RemarkFormatter;
use security::{SecurityMode, SecurityParams, SecurityScope};
use transport::{Network, TransportParams};

/// Per-request rendering inputs.
#[derive(Debug, Clone)]
pub struct LinkContext {
    /// Host the client connected to; used as the link address.
    pub address: String,
    /// Replaces the inbound port when set.
    pub port: Option<u16>,
    pub remark_model: String,
    pub show_info: bool,
}

pub struct LinkGenerator<'a, R: Rng> {
    ctx: &'a LinkContext,
    remark: RemarkFormatter<'a>,
    rng: R,
}

impl<'a, R: Rng> LinkGenerator<'a, R> {
    pub fn new(ctx: &'a LinkContext, rng: R) -> Self {
        Self {
            ctx,
            remark: RemarkFormatter::new(&ctx.remark_model, ctx.show_info),
            rng,
        }
    }

    /// Renders the link(s) for the client labelled `email`.
    ///
    /// Returns an empty string when the inbound cannot be rendered. Inbounds
    /// with external proxies yield one link per proxy, newline-joined.
    pub fn generate(&mut self, inbound: &Inbound, email: &str, clients: &[Client]) -> String {
        let Some(protocol) = inbound.protocol_kind() else {
            debug!("Inbound {} has unsupported protocol {}", inbound.id, inbound.protocol);
            return String::new();
        };
        let stream: Value = match serde_json::from_str(&inbound.stream_settings) {
            Ok(v) => v,
            Err(e) => {
                debug!("Inbound {} stream settings unreadable: {}", inbound.id, e);
                return String::new();
            }
        };
        let Some(client) = clients.iter().find(|c| c.email == email) else {
            return String::new();
        };

        match protocol {
            Protocol::Vmess => self.vmess(inbound, &stream, client),
            Protocol::Vless => self.uri("vless", &client.id, inbound, &stream, client),
            Protocol::Trojan => self.uri("trojan", &client.password, inbound, &stream, client),
            Protocol::Shadowsocks => self.shadowsocks(inbound, &stream, client),
        }
    }

    fn port(&self, inbound: &Inbound) -> i64 {
        self.ctx.port.map(i64::from).unwrap_or(inbound.port)
    }

    fn vmess(&mut self, inbound: &Inbound, stream: &Value, client: &Client) -> String {
        let network = Network::from_stream(stream);
        let transport = TransportParams::from_stream(stream, &network);
        let security = SecurityParams::from_stream(stream, SecurityScope::Full, &mut self.rng);

        let mut obj = ParamSet::new();
        obj.set("v", "2");
        obj.set("add", self.ctx.address.as_str());
        obj.set("port", self.port(inbound));
        obj.set("type", "none");
        obj.set("net", network.as_str());
        transport.write_json(&mut obj, &network);
        security.write_json(&mut obj);
        obj.set("id", &client.id);
        obj.set("aid", 0i64);
        obj.set("scy", &client.security);

        let proxies = external_proxy::list_from_stream(stream);
        if proxies.is_empty() {
            obj.set("ps", self.remark.render(inbound, &client.email, ""));
            return encode_vmess(&obj);
        }

        proxies
            .iter()
            .map(|proxy| {
                let mut obj = obj.clone();
                obj.set("add", proxy.dest.as_str());
                obj.set("port", proxy.port);
                if let Some(mode) = proxy.forced_security() {
                    obj.set("tls", mode);
                    if mode == SecurityMode::None.as_str() {
                        obj.remove_all(&TLS_IDENTITY_KEYS);
                    }
                }
                obj.set("ps", self.remark.render(inbound, &client.email, &proxy.remark));
                encode_vmess(&obj)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn uri(
        &mut self,
        scheme: &str,
        credential: &str,
        inbound: &Inbound,
        stream: &Value,
        client: &Client,
    ) -> String {
        let network = Network::from_stream(stream);
        let transport = TransportParams::from_stream(stream, &network);
        let mut security =
            SecurityParams::from_stream(stream, SecurityScope::Full, &mut self.rng);
        security.attach_flow(&client.flow, &network);

        let mut params = ParamSet::new();
        params.set("type", network.as_str());
        transport.write_query(&mut params, &network);
        security.write_query(&mut params);

        let proxies = external_proxy::list_from_stream(stream);
        if proxies.is_empty() {
            if security.mode == SecurityMode::None {
                params.remove_all(&TLS_IDENTITY_KEYS);
            }
            let remark = self.remark.render(inbound, &client.email, "");
            return build_uri(
                scheme,
                credential,
                &self.ctx.address,
                self.port(inbound),
                &params,
                &remark,
            );
        }

        proxies
            .iter()
            .map(|proxy| {
                let mode = proxy.forced_security().unwrap_or(security.mode.as_str());
                let mut params = params.clone();
                params.set("security", mode);
                if mode == SecurityMode::None.as_str() {
                    params.remove_all(&TLS_IDENTITY_KEYS);
                }
                self.proxy_uri(scheme, credential, inbound, client, proxy, &params)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn shadowsocks(&mut self, inbound: &Inbound, stream: &Value, client: &Client) -> String {
        let settings: Value = serde_json::from_str(&inbound.settings).unwrap_or_default();
        let method = settings.get("method").and_then(Value::as_str);
        let server_password = settings.get("password").and_then(Value::as_str);
        let (Some(method), Some(server_password)) = (method, server_password) else {
            debug!("Inbound {} lacks shadowsocks method or password", inbound.id);
            return String::new();
        };

        let secret = if method.contains("2022") || client.password.is_empty() {
            server_password
        } else {
            client.password.as_str()
        };
        let credential = STANDARD.encode(format!("{}:{}", method, secret));

        let network = Network::from_stream(stream);
        let transport = TransportParams::from_stream(stream, &network);
        let security = SecurityParams::from_stream(stream, SecurityScope::TlsOnly, &mut self.rng);

        let mut params = ParamSet::new();
        params.set("type", network.as_str());
        transport.write_query(&mut params, &network);
        security.write_query(&mut params);

        let proxies = external_proxy::list_from_stream(stream);
        if proxies.is_empty() {
            let remark = self.remark.render(inbound, &client.email, "");
            return build_uri(
                "ss",
                &credential,
                &self.ctx.address,
                self.port(inbound),
                &params,
                &remark,
            );
        }

        proxies
            .iter()
            .map(|proxy| {
                let mut params = params.clone();
                params.set(
                    "security",
                    proxy.forced_security().unwrap_or(security.mode.as_str()),
                );
                self.proxy_uri("ss", &credential, inbound, client, proxy, &params)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn proxy_uri(
        &self,
        scheme: &str,
        credential: &str,
        inbound: &Inbound,
        client: &Client,
        proxy: &ExternalProxy,
        params: &ParamSet,
    ) -> String {
        let remark = self.remark.render(inbound, &client.email, &proxy.remark);
        build_uri(scheme, credential, &proxy.dest, proxy.port.into(), params, &remark)
    }
}

fn encode_vmess(obj: &ParamSet) -> String {
    format!("vmess://{}", STANDARD.encode(obj.to_json_pretty()))
}

fn build_uri(
    scheme: &str,
    credential: &str,
    host: &str,
    port: i64,
    params: &ParamSet,
    remark: &str,
) -> String {
    format!(
        "{}://{}@{}:{}?{}#{}",
        scheme,
        escape_userinfo(credential),
        authority_host(host),
        port,
        params.to_query(),
        urlencoding::encode(remark)
    )
}

fn authority_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// Percent-encodes everything a URI userinfo component may not carry as-is.
fn escape_userinfo(raw: &str) -> String {
    const ALLOWED: &[u8] = b"-._~!$&'()*+,;=";
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || ALLOWED.contains(&byte) {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{:02X}", byte);
        }
    }
    out
}
