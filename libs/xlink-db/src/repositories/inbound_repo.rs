use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use super::InboundStore;
use crate::models::inbound::Inbound;
use crate::models::traffic::ClientTraffic;

#[derive(Debug, Clone)]
pub struct InboundRepository {
    pool: SqlitePool,
}

impl InboundRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_client_stats(&self, inbound_id: i64) -> Result<Vec<ClientTraffic>> {
        sqlx::query_as::<_, ClientTraffic>(
            "SELECT * FROM client_traffics WHERE inbound_id = ? ORDER BY id",
        )
        .bind(inbound_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch client traffics")
    }

    async fn with_stats(&self, mut inbound: Inbound) -> Result<Inbound> {
        inbound.client_stats = self.get_client_stats(inbound.id).await?;
        Ok(inbound)
    }
}

#[async_trait]
impl InboundStore for InboundRepository {
    async fn inbounds_by_sub_id(&self, sub_id: &str) -> Result<Vec<Inbound>> {
        let inbounds = sqlx::query_as::<_, Inbound>(
            r#"
            SELECT * FROM inbounds WHERE id IN (
                SELECT DISTINCT inbounds.id
                FROM inbounds, json_each(json_extract(inbounds.settings, '$.clients')) AS client
                WHERE protocol IN ('vmess', 'vless', 'trojan', 'shadowsocks')
                  AND json_extract(client.value, '$.subId') = ?
                  AND enable = 1
            )
            ORDER BY id
            "#,
        )
        .bind(sub_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch inbounds by subscription id")?;

        debug!("Found {} inbounds for sub {}", inbounds.len(), sub_id);

        let mut result = Vec::with_capacity(inbounds.len());
        for inbound in inbounds {
            result.push(self.with_stats(inbound).await?);
        }
        Ok(result)
    }

    async fn inbound_by_client_email(&self, email: &str) -> Result<Option<Inbound>> {
        let inbound = sqlx::query_as::<_, Inbound>(
            r#"
            SELECT * FROM inbounds
            WHERE enable = 1
              AND protocol IN ('vmess', 'vless', 'trojan', 'shadowsocks')
              AND json_extract(settings, '$.clients') IS NOT NULL
              AND EXISTS (
                  SELECT 1 FROM json_each(json_extract(settings, '$.clients')) AS client
                  WHERE json_extract(client.value, '$.email') = ?
              )
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch inbound by client email")?;

        match inbound {
            Some(inbound) => Ok(Some(self.with_stats(inbound).await?)),
            None => Ok(None),
        }
    }

    async fn fallback_master(&self, dest: &str) -> Result<Option<Inbound>> {
        sqlx::query_as::<_, Inbound>(
            r#"
            SELECT * FROM inbounds
            WHERE json_type(settings, '$.fallbacks') = 'array'
              AND EXISTS (
                  SELECT 1 FROM json_each(settings, '$.fallbacks')
                  WHERE json_extract(value, '$.dest') = ?
              )
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(dest)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch fallback master inbound")
    }
}
