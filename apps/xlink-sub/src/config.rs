use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

fn default_listen_port() -> u16 {
    2096
}

fn default_sub_path() -> String {
    "/sub/".to_string()
}

fn default_remark_model() -> String {
    "-ieo".to_string()
}

fn default_true() -> bool {
    true
}

fn default_update_interval() -> u32 {
    12
}

fn default_converter_url() -> String {
    "https://sub.datapipe.top/sub".to_string()
}

fn default_converter_timeout_secs() -> u64 {
    30
}

fn default_hidden_port() -> u16 {
    45556
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubConfig {
    pub database_url: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_sub_path")]
    pub sub_path: String,
    #[serde(default = "default_remark_model")]
    pub remark_model: String,
    /// Append remaining traffic and expiry date to link remarks.
    #[serde(default = "default_true")]
    pub show_info: bool,
    /// Base64-encode the subscription body.
    #[serde(default = "default_true")]
    pub encrypt: bool,
    /// Hours, sent as `Profile-Update-Interval`.
    #[serde(default = "default_update_interval")]
    pub update_interval: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_converter_url")]
    pub converter_url: String,
    #[serde(default = "default_converter_timeout_secs")]
    pub converter_timeout_secs: u64,
    #[serde(default = "default_hidden_port")]
    pub hidden_port: u16,
}

impl SubConfig {
    pub fn load() -> Result<Self> {
        let config_paths = ["/etc/xlink/sub.toml", "./sub.toml"];

        for path in config_paths {
            if let Ok(contents) = fs::read_to_string(path) {
                tracing::info!("Loading config from {}", path);
                let config: Self = toml::from_str(&contents)
                    .with_context(|| format!("Invalid config file {}", path))?;
                return Ok(config.normalized());
            }
        }

        tracing::info!("Loading config from environment");
        Self::from_env(|key| std::env::var(key).ok())
    }

    fn from_env(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        fn parsed<T: std::str::FromStr>(
            var: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: T,
        ) -> T {
            var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
        }

        let config = Self {
            database_url: var("DATABASE_URL").context("DATABASE_URL is not set")?,
            listen_port: parsed(&var, "LISTEN_PORT", default_listen_port()),
            sub_path: var("SUB_PATH").unwrap_or_else(default_sub_path),
            remark_model: var("REMARK_MODEL").unwrap_or_else(default_remark_model),
            show_info: parsed(&var, "SUB_SHOW_INFO", true),
            encrypt: parsed(&var, "SUB_ENCRYPT", true),
            update_interval: parsed(&var, "SUB_UPDATES", default_update_interval()),
            title: var("SUB_TITLE").unwrap_or_default(),
            converter_url: var("CONVERTER_URL").unwrap_or_else(default_converter_url),
            converter_timeout_secs: parsed(
                &var,
                "CONVERTER_TIMEOUT_SECS",
                default_converter_timeout_secs(),
            ),
            hidden_port: parsed(&var, "HIDDEN_PORT", default_hidden_port()),
        };
        Ok(config.normalized())
    }

    /// Ensures `sub_path` is wrapped in slashes, e.g. `sub` becomes `/sub/`.
    fn normalized(mut self) -> Self {
        let trimmed = self.sub_path.trim_matches('/');
        self.sub_path = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        };
        self
    }
}
