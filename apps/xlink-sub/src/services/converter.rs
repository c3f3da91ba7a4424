use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Turns a share link into a full client configuration document.
#[async_trait]
pub trait ConfigConverter: Send + Sync {
    async fn convert(&self, link: &str) -> Result<String>;
}

/// Remote subconverter-style service producing Clash YAML.
#[derive(Clone)]
pub struct SubscriptionConverter {
    client: Client,
    base_url: String,
}

impl SubscriptionConverter {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build converter HTTP client")?;
        Ok(Self { client, base_url })
    }
}

fn request_url(base_url: &str, link: &str) -> Result<Url> {
    Url::parse_with_params(
        base_url,
        &[("target", "clash"), ("url", link), ("insert", "false")],
    )
    .with_context(|| format!("Invalid converter URL {}", base_url))
}

#[async_trait]
impl ConfigConverter for SubscriptionConverter {
    async fn convert(&self, link: &str) -> Result<String> {
        let url = request_url(&self.base_url, link)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Converter request failed")?
            .error_for_status()
            .context("Converter returned an error status")?;

        response
            .text()
            .await
            .context("Failed to read converter response")
    }
}
