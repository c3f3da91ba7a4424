use serde::Deserialize;
use serde_json::Value;

/// An alternative public entry point (CDN, relay) advertised for an inbound.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternalProxy {
    #[serde(rename = "forceTls", default)]
    pub force_tls: String,
    pub dest: String,
    pub port: u16,
    #[serde(default)]
    pub remark: String,
}

impl ExternalProxy {
    /// Security mode this entry point imposes, or `None` to keep the inbound's.
    pub fn forced_security(&self) -> Option<&str> {
        match self.force_tls.as_str() {
            "" | "same" => None,
            mode => Some(mode),
        }
    }
}

/// Reads `externalProxy` from stream settings, skipping malformed records.
pub fn list_from_stream(stream: &Value) -> Vec<ExternalProxy> {
    let Some(records) = stream.get("externalProxy").and_then(Value::as_array) else {
        return Vec::new();
    };
    records
        .iter()
        .filter_map(|record| ExternalProxy::deserialize(record).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skips_malformed_records() {
        let stream = json!({"externalProxy": [
            {"forceTls": "tls", "dest": "cdn.example", "port": 443, "remark": "CDN"},
            {"dest": "no-port.example"},
            {"forceTls": "same", "dest": "relay.example", "port": 70000},
            {"dest": "plain.example", "port": 8443}
        ]});
        let proxies = list_from_stream(&stream);
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[0].forced_security(), Some("tls"));
        assert_eq!(proxies[1].dest, "plain.example");
        assert_eq!(proxies[1].forced_security(), None);
    }

    #[test]
    fn same_keeps_inbound_mode() {
        let proxy = ExternalProxy {
            force_tls: "same".into(),
            dest: "x".into(),
            port: 1,
            remark: String::new(),
        };
        assert_eq!(proxy.forced_security(), None);
    }

    #[test]
    fn missing_list_is_empty() {
        assert!(list_from_stream(&json!({})).is_empty());
        assert!(list_from_stream(&json!({"externalProxy": {}})).is_empty());
    }
}
