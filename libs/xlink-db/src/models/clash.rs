use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Converted Clash config cached per client email.
///
/// `url_fingerprint` is the fingerprint of the link the payload was produced from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClashSubscription {
    pub id: i64,
    pub email: String,
    pub url_fingerprint: String,
    pub yaml_content: String,
    pub created_at: i64,
    pub updated_at: i64,
}
