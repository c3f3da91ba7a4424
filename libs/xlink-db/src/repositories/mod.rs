pub mod clash_repo;
pub mod inbound_repo;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::clash::ClashSubscription;
use crate::models::inbound::Inbound;

/// Read access to inbound records, with `client_stats` populated.
#[async_trait]
pub trait InboundStore: Send + Sync {
    /// Enabled inbounds of a linkable protocol holding a client tagged `sub_id`.
    async fn inbounds_by_sub_id(&self, sub_id: &str) -> Result<Vec<Inbound>>;

    /// First enabled inbound of a linkable protocol holding a client with `email`.
    async fn inbound_by_client_email(&self, email: &str) -> Result<Option<Inbound>>;

    /// Inbound whose settings declare a fallback with `dest` equal to `dest`.
    async fn fallback_master(&self, dest: &str) -> Result<Option<Inbound>>;
}

#[async_trait]
pub trait ClashCacheStore: Send + Sync {
    async fn get_by_email(&self, email: &str) -> Result<Option<ClashSubscription>>;

    async fn insert(&self, entry: &ClashSubscription) -> Result<i64>;

    /// Overwrites the row with `entry.id`, created_at included.
    async fn update(&self, entry: &ClashSubscription) -> Result<()>;
}
