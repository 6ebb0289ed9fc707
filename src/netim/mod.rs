//! Riverbed NetIM client — metric-class lookup, device inventory, and
//! custom-metric ingestion.
//!
//! All calls use basic auth against the NetIM core API. TLS
//! verification is toggleable because lab installs run self-signed
//! certificates.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub mod import;
pub mod metrics;

use crate::config::Config;
use crate::pipeline::Reading;
use self::metrics::{select_metric_class, MetricClassList, MetricLookupError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The NetIM inventory page size. One page is enough; the bridge is
/// not built for installations past this size.
const INVENTORY_LIMIT: u32 = 5000;

/// One row of the NetIM device inventory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDevice {
    pub name: String,
    pub device_access_info_id: String,
}

#[derive(Debug, Deserialize)]
struct InventoryPage {
    #[serde(default)]
    items: Vec<InventoryDevice>,
}

/// The management-platform surface the pipeline depends on.
#[async_trait]
pub trait NetImApi: Send + Sync {
    /// Resolve the configured metric display name to a metric-class id,
    /// validating the class declares the expected sub-metrics.
    async fn resolve_metric_id(&self, expected_name: &str) -> Result<String, MetricLookupError>;

    /// The full device inventory.
    async fn inventory_devices(&self) -> Result<Vec<InventoryDevice>>;

    /// Upload one sample for one device. A non-200 response is an
    /// error; there is exactly one attempt per reading.
    async fn upload_reading(&self, reading: &Reading, metric_id: &str) -> Result<()>;
}

pub struct NetImClient {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
}

impl NetImClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!config.validate_tls)
            .build()
            .context("Failed to build NetIM HTTP client")?;
        Ok(Self {
            client,
            base_url: config.netim_base_url.clone(),
            user: config.netim_user.clone(),
            password: config.netim_password.clone(),
        })
    }
}

#[async_trait]
impl NetImApi for NetImClient {
    async fn resolve_metric_id(&self, expected_name: &str) -> Result<String, MetricLookupError> {
        let resp = self
            .client
            .get(format!("{}/api/netim/v1/metric-classes", self.base_url))
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(|e| MetricLookupError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(MetricLookupError::Transport(format!(
                "metric-classes request returned status {status}"
            )));
        }

        let list: MetricClassList = resp
            .json()
            .await
            .map_err(|e| MetricLookupError::Transport(format!("invalid metric-classes body: {e}")))?;

        select_metric_class(&list.items, expected_name).map(|class| class.id.clone())
    }

    async fn inventory_devices(&self) -> Result<Vec<InventoryDevice>> {
        let resp = self
            .client
            .get(format!(
                "{}/api/netim/v1/devices?limit={INVENTORY_LIMIT}&offset=0",
                self.base_url
            ))
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .context("NetIM devices request failed")?;

        let status = resp.status().as_u16();
        if status != 200 {
            anyhow::bail!("NetIM devices request returned status {status}");
        }

        let page: InventoryPage = resp
            .json()
            .await
            .context("NetIM devices response is not valid JSON")?;
        debug!(count = page.items.len(), "NetIM inventory fetched");
        Ok(page.items)
    }

    async fn upload_reading(&self, reading: &Reading, metric_id: &str) -> Result<()> {
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let body = import::import_body(reading, metric_id, timestamp_ms);

        let resp = self
            .client
            .post(format!(
                "{}/swarm/NETIM_NETWORK_METRIC_IMPORT_SERVICE/api/v1/network-metric-import",
                self.base_url
            ))
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("NetIM metric import request failed")?;

        let status = resp.status().as_u16();
        if status != 200 {
            anyhow::bail!("NetIM metric import returned status {status}");
        }
        Ok(())
    }
}
