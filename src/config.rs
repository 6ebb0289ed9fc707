//! Runtime configuration, read once from the environment at startup.

use anyhow::{Context, Result};

/// Everything the bridge needs to talk to both vendor APIs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Meross cloud account email.
    pub meross_email: String,
    /// Meross cloud account password.
    pub meross_password: String,
    /// NetIM core base URL, without a trailing slash.
    pub netim_base_url: String,
    /// NetIM REST API user.
    pub netim_user: String,
    /// NetIM REST API password.
    pub netim_password: String,
    /// Whether to verify the NetIM TLS certificate. Lab installs run
    /// self-signed certs, so this can be switched off.
    pub validate_tls: bool,
    /// Display name of the user custom metric class to upload into.
    pub metric_name: String,
    /// Minutes between pipeline runs.
    pub poll_interval_minutes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            meross_email: required("MEROSS_API_EMAIL")?,
            meross_password: required("MEROSS_API_PASSWORD")?,
            netim_base_url: normalize_base_url(&required("NETIM_BASE_URL")?),
            netim_user: required("NETIM_API_USER")?,
            netim_password: required("NETIM_API_PASSWORD")?,
            validate_tls: parse_bool(&optional("NETIM_VALIDATE_TLS", "true"))
                .context("NETIM_VALIDATE_TLS must be true or false")?,
            metric_name: optional("NETIM_METRIC_NAME", "Power Consumption"),
            poll_interval_minutes: optional("POLL_INTERVAL_MINUTES", "5")
                .parse()
                .context("POLL_INTERVAL_MINUTES must be a positive integer")?,
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("Missing required environment variable {name}"))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
