use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, warn};
use xlink_db::models::traffic::ClientTraffic;
use xlink_db::repositories::InboundStore;

use super::fallback::resolve_fallback;
use crate::error::SubError;
use crate::link::{LinkContext, LinkGenerator};

/// Combined traffic of every client in one subscription.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrafficSummary {
    pub up: i64,
    pub down: i64,
    /// 0 means unlimited.
    pub total: i64,
    /// Epoch milliseconds; 0 means none or mixed.
    pub expiry_time: i64,
    seeded: bool,
}

impl TrafficSummary {
    pub fn add(&mut self, traffic: &ClientTraffic) {
        if !self.seeded {
            self.seeded = true;
            self.up = traffic.up;
            self.down = traffic.down;
            self.total = traffic.total;
            if traffic.expiry_time > 0 {
                self.expiry_time = traffic.expiry_time;
            }
            return;
        }

        self.up = self.up.saturating_add(traffic.up);
        self.down = self.down.saturating_add(traffic.down);
        if self.total == 0 || traffic.total == 0 {
            self.total = 0;
        } else {
            self.total = self.total.saturating_add(traffic.total);
        }
        if traffic.expiry_time != self.expiry_time {
            self.expiry_time = 0;
        }
    }

    /// Value of the `Subscription-Userinfo` header.
    pub fn header(&self) -> String {
        format!(
            "upload={}; download={}; total={}; expire={}",
            self.up,
            self.down,
            self.total,
            self.expiry_time / 1000
        )
    }
}

pub struct SubscriptionService {
    store: Arc<dyn InboundStore>,
    remark_model: String,
    show_info: bool,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn InboundStore>, remark_model: String, show_info: bool) -> Self {
        Self {
            store,
            remark_model,
            show_info,
        }
    }

    /// Renders every link of subscription `sub_id` for clients reaching us via `host`.
    ///
    /// Returns the links and the traffic header value.
    pub async fn get_subs(
        &self,
        sub_id: &str,
        host: &str,
    ) -> Result<(Vec<String>, String), SubError> {
        let inbounds = self
            .store
            .inbounds_by_sub_id(sub_id)
            .await
            .map_err(SubError::Store)?;
        if inbounds.is_empty() {
            return Err(SubError::NotFound(format!("subscription {}", sub_id)));
        }

        let ctx = LinkContext {
            address: host.to_string(),
            port: None,
            remark_model: self.remark_model.clone(),
            show_info: self.show_info,
        };

        let mut links = Vec::new();
        let mut traffic = TrafficSummary::default();

        for mut inbound in inbounds {
            let clients = match inbound.clients() {
                Ok(clients) => clients,
                Err(e) => {
                    warn!("Skipping inbound {}: unreadable clients: {}", inbound.id, e);
                    continue;
                }
            };

            resolve_fallback(self.store.as_ref(), &mut inbound).await;

            let mut generator = LinkGenerator::new(&ctx, StdRng::from_os_rng());
            for client in clients
                .iter()
                .filter(|c| c.enable && c.sub_id == sub_id)
            {
                let link = generator.generate(&inbound, &client.email, &clients);
                if link.is_empty() {
                    debug!("No link for {} on inbound {}", client.email, inbound.id);
                } else {
                    links.push(link);
                }
                let stats = inbound.traffic_for(&client.email).cloned().unwrap_or_default();
                traffic.add(&stats);
            }
        }

        debug!("Subscription {} rendered {} links", sub_id, links.len());
        Ok((links, traffic.header()))
    }
}
