//! Meross cloud adapter — discovery and bulk electricity readings for
//! MSS310 plugs.
//!
//! The cloud session is short-lived: every operation signs in, does its
//! work, and signs out again. Tokens are never cached across pipeline
//! runs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{PlugReading, PlugSource};

const BASE_URL: &str = "https://iotx-eu-api.meross.com";

/// The one plug model this bridge understands.
const DEVICE_TYPE: &str = "mss310";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MerossSource {
    client: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
}

impl MerossSource {
    pub fn new(email: String, password: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build Meross HTTP client")?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            email,
            password,
        })
    }

    /// Sign in and return a session token.
    async fn sign_in(&self) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/v1/Auth/signIn", self.base_url))
            .json(&serde_json::json!({
                "email": &self.email,
                "password": &self.password,
            }))
            .send()
            .await
            .context("Meross sign-in request failed")?;

        let status = resp.status().as_u16();
        if status != 200 {
            anyhow::bail!("Meross sign-in returned status {status}");
        }

        let body: Value = resp.json().await.context("Meross sign-in response is not JSON")?;
        if body["apiStatus"].as_i64().unwrap_or(-1) != 0 {
            anyhow::bail!(
                "Meross sign-in rejected: {}",
                body["info"].as_str().unwrap_or("no detail")
            );
        }

        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("Meross sign-in response carries no token")
    }

    /// Best-effort sign-out. A dangling cloud session expires on its
    /// own, so failures are only logged.
    async fn sign_out(&self, token: &str) {
        let result = self
            .client
            .post(format!("{}/v1/Profile/logout", self.base_url))
            .bearer_auth(token)
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => warn!(status = resp.status().as_u16(), "Meross sign-out refused"),
            Err(e) => warn!("Meross sign-out failed: {e}"),
        }
    }

    /// All devices on the account, as raw vendor rows.
    async fn device_list(&self, token: &str) -> Result<Vec<Value>> {
        let resp = self
            .client
            .post(format!("{}/v1/Device/devList", self.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Meross device list request failed")?;

        let status = resp.status().as_u16();
        if status != 200 {
            anyhow::bail!("Meross device list returned status {status}");
        }

        let body: Value = resp.json().await.context("Meross device list response is not JSON")?;
        Ok(body["data"].as_array().cloned().unwrap_or_default())
    }

    /// One bulk round-trip covering every MSS310 on the account.
    async fn bulk_electricity(&self, token: &str) -> Result<Vec<PlugReading>> {
        let resp = self
            .client
            .post(format!("{}/v1/Device/electricity", self.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({ "deviceType": DEVICE_TYPE }))
            .send()
            .await
            .context("Meross electricity request failed")?;

        let status = resp.status().as_u16();
        if status != 200 {
            anyhow::bail!("Meross electricity fetch returned status {status}");
        }

        let body: Value = resp
            .json()
            .await
            .context("Meross electricity response is not JSON")?;
        Ok(parse_electricity(&body))
    }

    fn is_online_plug(device: &Value) -> bool {
        device["deviceType"].as_str() == Some(DEVICE_TYPE)
            && device["onlineStatus"].as_i64() == Some(1)
    }
}

#[async_trait]
impl PlugSource for MerossSource {
    async fn discover_devices(&self) -> Result<Vec<String>> {
        let token = self.sign_in().await?;
        let devices = self.device_list(&token).await;
        self.sign_out(&token).await;

        let names = devices?
            .iter()
            .filter(|d| Self::is_online_plug(d))
            .filter_map(|d| d["devName"].as_str().map(str::to_string))
            .collect();
        Ok(names)
    }

    async fn fetch_readings(&self) -> Result<Vec<PlugReading>> {
        let token = self.sign_in().await?;
        let readings = self.bulk_electricity(&token).await;
        self.sign_out(&token).await;
        readings
    }
}

/// Pull the per-plug readings out of the bulk electricity envelope.
/// Rows without a name or readings block are dropped.
fn parse_electricity(body: &Value) -> Vec<PlugReading> {
    let rows = match body["data"].as_array() {
        Some(rows) => rows,
        None => return Vec::new(),
    };

    rows.iter()
        .filter_map(|row| {
            let name = row["devName"].as_str()?;
            let electricity = &row["electricity"];
            Some(PlugReading {
                name: name.to_string(),
                power_watt: electricity["power"].as_f64()?,
                voltage: electricity["voltage"].as_f64()?,
                current_amp: electricity["current"].as_f64()?,
            })
        })
        .inspect(|r| debug!(plug = %r.name, power_watt = r.power_watt, "plug reading received"))
        .collect()
}
