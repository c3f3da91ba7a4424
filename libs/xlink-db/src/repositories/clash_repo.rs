use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use super::ClashCacheStore;
use crate::models::clash::ClashSubscription;

#[derive(Debug, Clone)]
pub struct ClashSubscriptionRepository {
    pool: SqlitePool,
}

impl ClashSubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClashCacheStore for ClashSubscriptionRepository {
    async fn get_by_email(&self, email: &str) -> Result<Option<ClashSubscription>> {
        sqlx::query_as::<_, ClashSubscription>(
            "SELECT * FROM clash_subscriptions WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch clash subscription")
    }

    async fn insert(&self, entry: &ClashSubscription) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO clash_subscriptions (email, url_fingerprint, yaml_content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&entry.email)
        .bind(&entry.url_fingerprint)
        .bind(&entry.yaml_content)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create clash subscription")?;

        Ok(id)
    }

    async fn update(&self, entry: &ClashSubscription) -> Result<()> {
        sqlx::query(
            "UPDATE clash_subscriptions SET email = ?, url_fingerprint = ?, yaml_content = ?, created_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&entry.email)
        .bind(&entry.url_fingerprint)
        .bind(&entry.yaml_content)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .bind(entry.id)
        .execute(&self.pool)
        .await
        .context("Failed to update clash subscription")?;
        Ok(())
    }
}
