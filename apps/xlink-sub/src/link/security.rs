use rand::Rng;
use rand::distr::Alphanumeric;
use serde_json::Value;
use xlink_shared::{first_short_id, search_key};

use super::params::ParamSet;
use super::transport::Network;

const SPIDER_X_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityMode {
    #[default]
    None,
    Tls,
    Reality,
}

impl SecurityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityMode::None => "none",
            SecurityMode::Tls => "tls",
            SecurityMode::Reality => "reality",
        }
    }
}

/// Which security layers a protocol can carry. Shadowsocks links only
/// understand plain TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityScope {
    Full,
    TlsOnly,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityParams {
    pub mode: SecurityMode,
    pub alpn: Option<String>,
    pub sni: Option<String>,
    pub fp: Option<String>,
    pub allow_insecure: bool,
    pub pbk: Option<String>,
    pub sid: Option<String>,
    pub spx: Option<String>,
    pub flow: Option<String>,
}

fn text(value: &Value, key: &str) -> Option<String> {
    search_key(value, key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl SecurityParams {
    pub fn from_stream<R: Rng>(stream: &Value, scope: SecurityScope, rng: &mut R) -> Self {
        match stream.get("security").and_then(Value::as_str) {
            Some("tls") => Self::tls(stream.get("tlsSettings")),
            Some("reality") if scope == SecurityScope::Full => {
                Self::reality(stream.get("realitySettings"), rng)
            }
            _ => Self::default(),
        }
    }

    fn tls(settings: Option<&Value>) -> Self {
        let mut params = SecurityParams {
            mode: SecurityMode::Tls,
            ..Default::default()
        };
        let Some(settings) = settings else {
            return params;
        };

        let alpn: Vec<&str> = settings
            .get("alpn")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if !alpn.is_empty() {
            params.alpn = Some(alpn.join(","));
        }

        params.sni = text(settings, "serverName");

        if let Some(nested) = search_key(settings, "settings").filter(|v| v.is_object()) {
            params.fp = text(nested, "fingerprint");
            params.allow_insecure =
                search_key(nested, "allowInsecure").and_then(Value::as_bool) == Some(true);
        }

        params
    }

    fn reality<R: Rng>(settings: Option<&Value>, rng: &mut R) -> Self {
        let mut params = SecurityParams {
            mode: SecurityMode::Reality,
            spx: Some(spider_x(rng)),
            ..Default::default()
        };
        let Some(settings) = settings else {
            return params;
        };

        params.sni = search_key(settings, "serverNames")
            .and_then(Value::as_array)
            .and_then(|names| names.first())
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(nested) = search_key(settings, "settings").filter(|v| v.is_object()) {
            params.pbk = text(nested, "publicKey");
            params.fp = text(nested, "fingerprint").filter(|fp| !fp.is_empty());
        }

        params.sid = search_key(settings, "shortIds")
            .and_then(Value::as_array)
            .and_then(|ids| first_short_id(ids));

        params
    }

    /// Reality over raw tcp carries the client's flow (e.g. `xtls-rprx-vision`).
    pub fn attach_flow(&mut self, flow: &str, network: &Network) {
        if self.mode == SecurityMode::Reality && *network == Network::Tcp && !flow.is_empty() {
            self.flow = Some(flow.to_string());
        }
    }

    pub fn write_query(&self, out: &mut ParamSet) {
        out.set("security", self.mode.as_str());
        self.write_common(out);
        out.set_opt("flow", self.flow.as_ref());
    }

    pub fn write_json(&self, out: &mut ParamSet) {
        if self.mode != SecurityMode::None {
            out.set("tls", self.mode.as_str());
        }
        self.write_common(out);
    }

    fn write_common(&self, out: &mut ParamSet) {
        out.set_opt("alpn", self.alpn.as_ref());
        out.set_opt("sni", self.sni.as_ref());
        out.set_opt("fp", self.fp.as_ref());
        if self.allow_insecure {
            out.set("allowInsecure", "1");
        }
        out.set_opt("pbk", self.pbk.as_ref());
        out.set_opt("sid", self.sid.as_ref());
        out.set_opt("spx", self.spx.as_ref());
    }
}

fn spider_x<R: Rng>(rng: &mut R) -> String {
    let suffix: String = (0..SPIDER_X_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    format!("/{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn tls_fields() {
        let stream = json!({
            "security": "tls",
            "tlsSettings": {
                "serverName": "example.com",
                "alpn": ["h2", "http/1.1"],
                "settings": {"fingerprint": "chrome", "allowInsecure": true}
            }
        });
        let params = SecurityParams::from_stream(&stream, SecurityScope::Full, &mut rng());
        assert_eq!(params.mode, SecurityMode::Tls);

        let mut query = ParamSet::new();
        params.write_query(&mut query);
        assert_eq!(
            query.to_query(),
            "allowInsecure=1&alpn=h2%2Chttp%2F1.1&fp=chrome&security=tls&sni=example.com"
        );
    }

    #[test]
    fn tls_without_settings_block() {
        let stream = json!({"security": "tls", "tlsSettings": {"alpn": []}});
        let params = SecurityParams::from_stream(&stream, SecurityScope::Full, &mut rng());
        assert_eq!(params.mode, SecurityMode::Tls);
        assert_eq!(params.alpn, None);
        assert_eq!(params.fp, None);
        assert!(!params.allow_insecure);
    }

    #[test]
    fn mistyped_values_are_absent() {
        let tls = json!({
            "security": "tls",
            "tlsSettings": {
                "alpn": "h2",
                "serverName": 5,
                "settings": [{"allowInsecure": true, "fingerprint": "chrome"}]
            }
        });
        let params = SecurityParams::from_stream(&tls, SecurityScope::Full, &mut rng());
        assert_eq!(params.mode, SecurityMode::Tls);
        assert_eq!(params.alpn, None);
        assert_eq!(params.sni, None);
        assert_eq!(params.fp, None);
        assert!(!params.allow_insecure);

        let tls = json!({
            "security": "tls",
            "tlsSettings": {"settings": {"allowInsecure": "true", "fingerprint": 1}}
        });
        let params = SecurityParams::from_stream(&tls, SecurityScope::Full, &mut rng());
        assert_eq!(params.fp, None);
        assert!(!params.allow_insecure);

        let reality = json!({
            "security": "reality",
            "realitySettings": {
                "serverNames": "a",
                "shortIds": {},
                "settings": [{"publicKey": "PBK"}]
            }
        });
        let params = SecurityParams::from_stream(&reality, SecurityScope::Full, &mut rng());
        assert_eq!(params.mode, SecurityMode::Reality);
        assert_eq!(params.sni, None);
        assert_eq!(params.sid, None);
        assert_eq!(params.pbk, None);
        assert_eq!(params.fp, None);
        assert!(params.spx.is_some());
    }

    fn reality_stream() -> Value {
        json!({
            "security": "reality",
            "realitySettings": {
                "serverNames": ["a.example", "b.example"],
                "shortIds": ["zz", "ABCDEF12", "11"],
                "settings": {"publicKey": "PUB", "fingerprint": ""}
            }
        })
    }

    #[test]
    fn reality_fields() {
        let params =
            SecurityParams::from_stream(&reality_stream(), SecurityScope::Full, &mut rng());
        assert_eq!(params.mode, SecurityMode::Reality);
        assert_eq!(params.sni.as_deref(), Some("a.example"));
        assert_eq!(params.pbk.as_deref(), Some("PUB"));
        assert_eq!(params.fp, None);
        assert_eq!(params.sid.as_deref(), Some("abcdef12"));

        let spx = params.spx.unwrap();
        assert_eq!(spx.len(), 16);
        assert!(spx.starts_with('/'));
        assert!(spx[1..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn reality_is_ignored_under_tls_only_scope() {
        let params =
            SecurityParams::from_stream(&reality_stream(), SecurityScope::TlsOnly, &mut rng());
        assert_eq!(params, SecurityParams::default());

        let mut query = ParamSet::new();
        params.write_query(&mut query);
        assert_eq!(query.to_query(), "security=none");
    }

    #[test]
    fn spider_x_follows_rng_state() {
        let a = SecurityParams::from_stream(&reality_stream(), SecurityScope::Full, &mut rng());
        let b = SecurityParams::from_stream(&reality_stream(), SecurityScope::Full, &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn flow_only_for_reality_over_tcp() {
        let mut params =
            SecurityParams::from_stream(&reality_stream(), SecurityScope::Full, &mut rng());
        params.attach_flow("xtls-rprx-vision", &Network::Ws);
        assert_eq!(params.flow, None);
        params.attach_flow("", &Network::Tcp);
        assert_eq!(params.flow, None);
        params.attach_flow("xtls-rprx-vision", &Network::Tcp);
        assert_eq!(params.flow.as_deref(), Some("xtls-rprx-vision"));

        let mut json = ParamSet::new();
        params.write_json(&mut json);
        assert!(!json.contains("flow"));
        assert_eq!(json.get_str("tls"), Some("reality"));

        let mut tls = SecurityParams::from_stream(
            &json!({"security": "tls"}),
            SecurityScope::Full,
            &mut rng(),
        );
        tls.attach_flow("xtls-rprx-vision", &Network::Tcp);
        assert_eq!(tls.flow, None);
    }

    #[test]
    fn none_mode_has_no_tls_key() {
        let params = SecurityParams::from_stream(&json!({}), SecurityScope::Full, &mut rng());
        let mut json = ParamSet::new();
        params.write_json(&mut json);
        assert!(json.to_json().as_object().unwrap().is_empty());
    }
}
