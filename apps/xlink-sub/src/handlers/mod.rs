pub mod clash;
pub mod health;
pub mod subscription;

use axum::http::{HeaderMap, header};

/// Host the client used to reach us, without port.
///
/// Prefers the first `X-Forwarded-Host` entry so links stay correct behind
/// a reverse proxy.
pub fn request_host(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-host")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let raw = forwarded
        .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
        .unwrap_or_default();

    strip_port(raw).to_string()
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}
