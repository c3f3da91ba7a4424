use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use xlink_db::models::clash::ClashSubscription;
use xlink_db::models::inbound::{Client, Inbound};
use xlink_db::repositories::{ClashCacheStore, InboundStore};

use super::converter::ConfigConverter;
use super::fallback::resolve_fallback;
use crate::error::SubError;
use crate::link::{LinkContext, LinkGenerator};

/// Serves Clash configs converted from a client's link, cached per email
/// and reconverted only when the link changes.
pub struct ClashService {
    inbounds: Arc<dyn InboundStore>,
    cache: Arc<dyn ClashCacheStore>,
    converter: Arc<dyn ConfigConverter>,
    remark_model: String,
    /// Placeholder port sent to the converter and swapped back afterwards.
    hidden_port: u16,
}

impl ClashService {
    pub fn new(
        inbounds: Arc<dyn InboundStore>,
        cache: Arc<dyn ClashCacheStore>,
        converter: Arc<dyn ConfigConverter>,
        remark_model: String,
        hidden_port: u16,
    ) -> Self {
        Self {
            inbounds,
            cache,
            converter,
            remark_model,
            hidden_port,
        }
    }

    pub async fn get_clash_subscription(
        &self,
        email: &str,
        host: &str,
    ) -> Result<String, SubError> {
        let mut inbound = self
            .inbounds
            .inbound_by_client_email(email)
            .await
            .map_err(SubError::Store)?
            .ok_or_else(|| SubError::NotFound(format!("client {}", email)))?;

        resolve_fallback(self.inbounds.as_ref(), &mut inbound).await;

        let link = self.render_link(&inbound, email, host);
        if link.is_empty() {
            return Err(SubError::NotFound(format!("link for client {}", email)));
        }
        let url_fingerprint = fingerprint(&link);

        let cached = self
            .cache
            .get_by_email(email)
            .await
            .map_err(SubError::Store)?;
        if let Some(entry) = &cached {
            if entry.url_fingerprint == url_fingerprint && !entry.yaml_content.is_empty() {
                debug!("Clash cache hit for {}", email);
                return Ok(entry.yaml_content.clone());
            }
        }

        info!("Converting Clash config for {}", email);
        let yaml = self
            .converter
            .convert(&link)
            .await
            .map_err(SubError::Conversion)?
            .replace(&self.hidden_port.to_string(), &inbound.port.to_string());

        self.store_entry(email, url_fingerprint, &yaml, cached).await;
        Ok(yaml)
    }

    /// Single link over enabled clients, rendered with a per-email seed so
    /// the same configuration always yields the same fingerprint.
    fn render_link(&self, inbound: &Inbound, email: &str, host: &str) -> String {
        let clients: Vec<Client> = match inbound.clients() {
            Ok(clients) => clients.into_iter().filter(|c| c.enable).collect(),
            Err(e) => {
                warn!("Inbound {} has unreadable clients: {}", inbound.id, e);
                return String::new();
            }
        };

        let ctx = LinkContext {
            address: host.to_string(),
            port: Some(self.hidden_port),
            remark_model: self.remark_model.clone(),
            show_info: false,
        };
        let rng = StdRng::seed_from_u64(seed_for(email));
        LinkGenerator::new(&ctx, rng).generate(inbound, email, &clients)
    }

    async fn store_entry(
        &self,
        email: &str,
        url_fingerprint: String,
        yaml: &str,
        cached: Option<ClashSubscription>,
    ) {
        let now = Utc::now().timestamp();
        let result = match cached {
            Some(mut entry) => {
                entry.url_fingerprint = url_fingerprint;
                entry.yaml_content = yaml.to_string();
                entry.updated_at = now;
                self.cache.update(&entry).await
            }
            None => {
                let entry = ClashSubscription {
                    id: 0,
                    email: email.to_string(),
                    url_fingerprint,
                    yaml_content: yaml.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                self.cache.insert(&entry).await.map(|_| ())
            }
        };

        if let Err(e) = result {
            warn!("Failed to cache Clash config for {}: {:#}", email, e);
        }
    }
}

/// Hex SHA-256 of a rendered link.
pub fn fingerprint(link: &str) -> String {
    Sha256::digest(link.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn seed_for(email: &str) -> u64 {
    let digest = Sha256::digest(email.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
