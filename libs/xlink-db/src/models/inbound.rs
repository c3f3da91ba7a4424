use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::traffic::ClientTraffic;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Inbound {
    pub id: i64,
    pub remark: String,
    pub enable: bool,
    pub listen: String,
    pub port: i64, // SQLite integer is i64
    pub protocol: String, // 'vmess', 'vless', 'trojan', 'shadowsocks', ...

    // Raw JSON text; parsed on demand since the shape depends on protocol/network
    pub settings: String,
    pub stream_settings: String,

    #[sqlx(skip)]
    #[serde(default)]
    pub client_stats: Vec<ClientTraffic>,
}

/// Protocols a subscription link can be rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Vmess,
    Vless,
    Trojan,
    Shadowsocks,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [
        Protocol::Vmess,
        Protocol::Vless,
        Protocol::Trojan,
        Protocol::Shadowsocks,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "vmess" => Some(Self::Vmess),
            "vless" => Some(Self::Vless),
            "trojan" => Some(Self::Trojan),
            "shadowsocks" => Some(Self::Shadowsocks),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vmess => "vmess",
            Self::Vless => "vless",
            Self::Trojan => "trojan",
            Self::Shadowsocks => "shadowsocks",
        }
    }
}

/// One credentialed user entry from the `clients` array of an inbound's settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    pub id: String,
    pub password: String,
    pub email: String,
    pub security: String,
    pub enable: bool,
    pub flow: String,
    #[serde(rename = "subId")]
    pub sub_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ClientList {
    #[serde(default)]
    clients: Vec<Client>,
}

impl Inbound {
    pub fn protocol_kind(&self) -> Option<Protocol> {
        Protocol::from_tag(&self.protocol)
    }

    pub fn clients(&self) -> Result<Vec<Client>, serde_json::Error> {
        let list: ClientList = serde_json::from_str(&self.settings)?;
        Ok(list.clients)
    }

    /// Listeners bound to an abstract socket (`@name`) are only reachable as
    /// a fallback target of another inbound.
    pub fn is_fallback_listener(&self) -> bool {
        self.listen.starts_with('@')
    }

    pub fn traffic_for(&self, email: &str) -> Option<&ClientTraffic> {
        self.client_stats.iter().find(|t| t.email == email)
    }
}
