//! In-memory store and converter doubles shared by service and router tests.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use xlink_db::models::clash::ClashSubscription;
use xlink_db::models::inbound::Inbound;
use xlink_db::repositories::{ClashCacheStore, InboundStore};

use super::converter::ConfigConverter;

#[derive(Default)]
pub struct MemoryInbounds {
    pub inbounds: Mutex<Vec<Inbound>>,
}

impl MemoryInbounds {
    pub fn new(inbounds: Vec<Inbound>) -> Self {
        Self {
            inbounds: Mutex::new(inbounds),
        }
    }

    pub fn replace_settings(&self, id: i64, settings: String) {
        let mut inbounds = self.inbounds.lock().unwrap();
        if let Some(inbound) = inbounds.iter_mut().find(|i| i.id == id) {
            inbound.settings = settings;
        }
    }

    fn linkable(&self) -> Vec<Inbound> {
        self.inbounds
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.enable && i.protocol_kind().is_some())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InboundStore for MemoryInbounds {
    async fn inbounds_by_sub_id(&self, sub_id: &str) -> Result<Vec<Inbound>> {
        Ok(self
            .linkable()
            .into_iter()
            .filter(|i| {
                // rows with unreadable clients are returned as-is
                i.clients()
                    .map(|clients| clients.iter().any(|c| c.sub_id == sub_id))
                    .unwrap_or(true)
            })
            .collect())
    }

    async fn inbound_by_client_email(&self, email: &str) -> Result<Option<Inbound>> {
        Ok(self.linkable().into_iter().find(|i| {
            i.clients()
                .map(|clients| clients.iter().any(|c| c.email == email))
                .unwrap_or(false)
        }))
    }

    async fn fallback_master(&self, dest: &str) -> Result<Option<Inbound>> {
        let inbounds = self.inbounds.lock().unwrap();
        Ok(inbounds
            .iter()
            .find(|i| {
                serde_json::from_str::<Value>(&i.settings)
                    .ok()
                    .and_then(|s| s.get("fallbacks").and_then(Value::as_array).cloned())
                    .map(|list| list.iter().any(|f| f["dest"] == dest))
                    .unwrap_or(false)
            })
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryClashCache {
    pub entries: Mutex<Vec<ClashSubscription>>,
    pub fail_writes: bool,
}

#[async_trait]
impl ClashCacheStore for MemoryClashCache {
    async fn get_by_email(&self, email: &str) -> Result<Option<ClashSubscription>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.iter().find(|e| e.email == email).cloned())
    }

    async fn insert(&self, entry: &ClashSubscription) -> Result<i64> {
        if self.fail_writes {
            anyhow::bail!("read-only");
        }
        let mut entries = self.entries.lock().unwrap();
        let id = entries.len() as i64 + 1;
        entries.push(ClashSubscription {
            id,
            ..entry.clone()
        });
        Ok(id)
    }

    async fn update(&self, entry: &ClashSubscription) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("read-only");
        }
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry.clone();
        }
        Ok(())
    }
}

/// Echoes the link back inside a minimal YAML document and counts calls.
#[derive(Default)]
pub struct CountingConverter {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl CountingConverter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigConverter for CountingConverter {
    async fn convert(&self, link: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("converter unreachable");
        }
        Ok(format!("proxies:\n  - port: 45556\n    link: \"{}\"\n", link))
    }
}
