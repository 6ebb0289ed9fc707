//! The end-to-end run: discover plugs, resolve the metric class,
//! reconcile against the NetIM inventory, bulk-fetch readings, upload
//! one sample per matched device.
//!
//! `run_once` never fails from the caller's point of view. Every
//! failure is logged and ends the current run; the scheduler carries on
//! to the next tick regardless.

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use crate::adapters::{PlugReading, PlugSource};
use crate::netim::NetImApi;

pub mod reconcile;

use self::reconcile::{reconcile, ManagedDevice};

/// One matched device's sample, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub power_watt: f64,
    pub voltage: f64,
    pub current_amp: f64,
    pub device_name: String,
    pub platform_id: String,
}

pub struct Pipeline {
    source: Box<dyn PlugSource>,
    netim: Box<dyn NetImApi>,
    metric_name: String,
}

impl Pipeline {
    pub fn new(source: Box<dyn PlugSource>, netim: Box<dyn NetImApi>, metric_name: String) -> Self {
        Self { source, netim, metric_name }
    }

    /// One complete bridge run.
    pub async fn run_once(&self) {
        info!("pipeline run starting");

        // Stage 1: discover plugs.
        let plug_names = match self.source.discover_devices().await {
            Ok(names) => names,
            Err(e) => {
                warn!("plug discovery failed: {e:#}");
                return;
            }
        };
        if plug_names.is_empty() {
            warn!("no active plugs found — nothing to monitor this run");
            return;
        }
        info!(count = plug_names.len(), "active plugs discovered");

        // Stage 2: resolve the metric class.
        let metric_id = match self.netim.resolve_metric_id(&self.metric_name).await {
            Ok(id) => id,
            Err(e) => {
                warn!("metric class not usable, is the user custom metric uploaded? {e}");
                return;
            }
        };
        info!(metric_id = %metric_id, "metric class resolved");

        // Stage 3: reconcile against the inventory.
        let inventory = match self.netim.inventory_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!("inventory fetch failed: {e:#}");
                return;
            }
        };
        let managed = reconcile(&inventory, &plug_names);
        if managed.is_empty() {
            warn!("no NetIM device is monitored through a discovered plug");
            return;
        }
        info!(count = managed.len(), "devices reconciled");

        // Stage 4: one bulk fetch, then discard unmatched rows locally.
        let raw = match self.source.fetch_readings().await {
            Ok(readings) => readings,
            Err(e) => {
                warn!("bulk reading fetch failed: {e:#}");
                return;
            }
        };
        let readings = retain_managed(raw, &managed);

        // Stage 5: upload, one sample per device, fail fast.
        let mut uploaded = 0usize;
        for reading in &readings {
            info!(device = %reading.device_name, "uploading sample");
            if let Err(e) = self.netim.upload_reading(reading, &metric_id).await {
                error!(
                    device = %reading.device_name,
                    "upload failed, aborting the remaining uploads for this run: {e:#}"
                );
                return;
            }
            uploaded += 1;
        }
        info!(uploaded, "pipeline run complete");
    }
}

/// Keep only readings for reconciled devices, pairing each with its
/// platform id. Order follows the bulk fetch.
fn retain_managed(raw: Vec<PlugReading>, managed: &[ManagedDevice]) -> Vec<Reading> {
    let by_name: HashMap<&str, &ManagedDevice> =
        managed.iter().map(|d| (d.name.as_str(), d)).collect();

    raw.into_iter()
        .filter_map(|plug| {
            let device = match by_name.get(plug.name.to_uppercase().as_str()) {
                Some(device) => *device,
                None => {
                    debug!(plug = %plug.name, "plug is not NetIM managed, reading discarded");
                    return None;
                }
            };
            Some(Reading {
                power_watt: plug.power_watt,
                voltage: plug.voltage,
                current_amp: plug.current_amp,
                device_name: device.name.clone(),
                platform_id: device.platform_id.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netim::metrics::MetricLookupError;
    use crate::netim::InventoryDevice;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct FakeSource {
        devices: Vec<String>,
        readings: Vec<PlugReading>,
        readings_requested: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PlugSource for FakeSource {
        async fn discover_devices(&self) -> Result<Vec<String>> {
            Ok(self.devices.clone())
        }

        async fn fetch_readings(&self) -> Result<Vec<PlugReading>> {
            self.readings_requested.store(true, Ordering::SeqCst);
            Ok(self.readings.clone())
        }
    }

    struct FakeNetIm {
        metric: Result<String, MetricLookupError>,
        inventory: Vec<InventoryDevice>,
        inventory_requested: Arc<AtomicBool>,
        /// Per-call upload outcomes; `false` fails that upload.
        upload_plan: Vec<bool>,
        uploads: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NetImApi for FakeNetIm {
        async fn resolve_metric_id(&self, _expected_name: &str) -> Result<String, MetricLookupError> {
            self.metric.clone()
        }

        async fn inventory_devices(&self) -> Result<Vec<InventoryDevice>> {
            self.inventory_requested.store(true, Ordering::SeqCst);
            Ok(self.inventory.clone())
        }

        async fn upload_reading(&self, reading: &Reading, _metric_id: &str) -> Result<()> {
            let mut uploads = self.uploads.lock().unwrap();
            let attempt = uploads.len();
            uploads.push(reading.device_name.clone());
            if self.upload_plan.get(attempt).copied().unwrap_or(true) {
                Ok(())
            } else {
                anyhow::bail!("NetIM metric import returned status 500")
            }
        }
    }

    fn plug(name: &str) -> PlugReading {
        PlugReading {
            name: name.to_string(),
            power_watt: 10.0,
            voltage: 230.0,
            current_amp: 0.05,
        }
    }

    fn device(name: &str, id: &str) -> InventoryDevice {
        InventoryDevice {
            name: name.to_string(),
            device_access_info_id: id.to_string(),
        }
    }

    struct Recorders {
        readings_requested: Arc<AtomicBool>,
        inventory_requested: Arc<AtomicBool>,
        uploads: Arc<Mutex<Vec<String>>>,
    }

    fn pipeline(
        devices: Vec<String>,
        readings: Vec<PlugReading>,
        metric: Result<String, MetricLookupError>,
        inventory: Vec<InventoryDevice>,
        upload_plan: Vec<bool>,
    ) -> (Pipeline, Recorders) {
        let recorders = Recorders {
            readings_requested: Arc::new(AtomicBool::new(false)),
            inventory_requested: Arc::new(AtomicBool::new(false)),
            uploads: Arc::new(Mutex::new(Vec::new())),
        };
        let source = FakeSource {
            devices,
            readings,
            readings_requested: Arc::clone(&recorders.readings_requested),
        };
        let netim = FakeNetIm {
            metric,
            inventory,
            inventory_requested: Arc::clone(&recorders.inventory_requested),
            upload_plan,
            uploads: Arc::clone(&recorders.uploads),
        };
        let pipeline = Pipeline::new(
            Box::new(source),
            Box::new(netim),
            "Power Consumption".to_string(),
        );
        (pipeline, recorders)
    }

    #[tokio::test]
    async fn test_happy_path_uploads_in_fetch_order() {
        let (pipeline, rec) = pipeline(
            vec!["RTR1".to_string(), "SW2".to_string()],
            vec![plug("SW2"), plug("RTR1")],
            Ok("mc-2".to_string()),
            vec![device("RTR1", "id-1"), device("SW2", "id-2")],
            vec![],
        );
        pipeline.run_once().await;
        assert_eq!(*rec.uploads.lock().unwrap(), vec!["SW2", "RTR1"]);
    }

    #[tokio::test]
    async fn test_no_discovered_plugs_stops_before_netim() {
        let (pipeline, rec) = pipeline(vec![], vec![], Ok("mc-2".to_string()), vec![], vec![]);
        pipeline.run_once().await;
        assert!(!rec.inventory_requested.load(Ordering::SeqCst));
        assert!(!rec.readings_requested.load(Ordering::SeqCst));
        assert!(rec.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metric_error_stops_before_inventory() {
        let (pipeline, rec) = pipeline(
            vec!["RTR1".to_string()],
            vec![plug("RTR1")],
            Err(MetricLookupError::InvalidDefinition {
                name: "Power Consumption".to_string(),
                missing: "Current".to_string(),
            }),
            vec![device("RTR1", "id-1")],
            vec![],
        );
        pipeline.run_once().await;
        assert!(!rec.inventory_requested.load(Ordering::SeqCst));
        assert!(!rec.readings_requested.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_reconciliation_skips_reading_fetch() {
        let (pipeline, rec) = pipeline(
            vec!["SW2".to_string()],
            vec![plug("SW2")],
            Ok("mc-2".to_string()),
            vec![device("RTR1", "id-1")],
            vec![],
        );
        pipeline.run_once().await;
        assert!(rec.inventory_requested.load(Ordering::SeqCst));
        assert!(!rec.readings_requested.load(Ordering::SeqCst));
        assert!(rec.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_upload_failure_aborts_the_rest() {
        let (pipeline, rec) = pipeline(
            vec!["RTR1".to_string(), "SW2".to_string()],
            vec![plug("RTR1"), plug("SW2")],
            Ok("mc-2".to_string()),
            vec![device("RTR1", "id-1"), device("SW2", "id-2")],
            vec![false, true],
        );
        pipeline.run_once().await;
        // One failed attempt, the second device never tried.
        assert_eq!(*rec.uploads.lock().unwrap(), vec!["RTR1"]);
    }

    #[tokio::test]
    async fn test_unmanaged_readings_are_discarded_locally() {
        let (pipeline, rec) = pipeline(
            vec!["RTR1".to_string(), "LAMP".to_string()],
            vec![plug("LAMP"), plug("RTR1")],
            Ok("mc-2".to_string()),
            vec![device("rtr1", "id-1")],
            vec![],
        );
        pipeline.run_once().await;
        assert_eq!(*rec.uploads.lock().unwrap(), vec!["RTR1"]);
    }

    #[test]
    fn test_retain_managed_pairs_platform_ids() {
        let managed = vec![ManagedDevice {
            name: "RTR1".to_string(),
            platform_id: "id-1".to_string(),
        }];
        let readings = retain_managed(vec![plug("rtr1"), plug("SW2")], &managed);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].device_name, "RTR1");
        assert_eq!(readings[0].platform_id, "id-1");
        assert_eq!(readings[0].voltage, 230.0);
    }
}
