use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};
use xlink_db::models::inbound::Inbound;
use xlink_db::repositories::InboundStore;

const INHERITED_KEYS: [&str; 3] = ["security", "tlsSettings", "externalProxy"];

/// Replaces the TLS layer and external proxies of `stream` with the master's.
///
/// Keys the master lacks are removed from the fallback.
pub fn merge_master_stream(stream: &str, master_stream: &str) -> Result<String> {
    let mut stream: Value =
        serde_json::from_str(stream).context("Fallback stream settings are not JSON")?;
    let master: Value =
        serde_json::from_str(master_stream).context("Master stream settings are not JSON")?;

    let target = stream
        .as_object_mut()
        .context("Fallback stream settings are not an object")?;
    for key in INHERITED_KEYS {
        match master.get(key) {
            Some(value) => {
                target.insert(key.to_string(), value.clone());
            }
            None => {
                target.remove(key);
            }
        }
    }

    Ok(stream.to_string())
}

/// Rewrites a fallback inbound so its links point at the master listener.
///
/// Returns whether a master was applied. Lookup or merge failures leave the
/// inbound unchanged.
pub async fn resolve_fallback(store: &dyn InboundStore, inbound: &mut Inbound) -> bool {
    if !inbound.is_fallback_listener() {
        return false;
    }
    match apply_master(store, inbound).await {
        Ok(applied) => applied,
        Err(e) => {
            warn!("Fallback lookup for inbound {} failed: {:#}", inbound.id, e);
            false
        }
    }
}

async fn apply_master(store: &dyn InboundStore, inbound: &mut Inbound) -> Result<bool> {
    let Some(master) = store.fallback_master(&inbound.listen).await? else {
        debug!("No master declares fallback dest {}", inbound.listen);
        return Ok(false);
    };

    inbound.stream_settings =
        merge_master_stream(&inbound.stream_settings, &master.stream_settings)?;
    inbound.listen = master.listen;
    inbound.port = master.port;
    debug!("Inbound {} served through master {}", inbound.id, master.id);
    Ok(true)
}
