use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-client counters maintained by the proxy core. Read-only here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClientTraffic {
    pub id: i64,
    pub inbound_id: i64,
    pub enable: bool,
    pub email: String,
    pub up: i64,
    pub down: i64,
    pub total: i64,
    /// Epoch milliseconds; 0 means no expiry.
    pub expiry_time: i64,
}
