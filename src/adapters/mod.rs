//! Source-side adapter trait — smart-plug vendor interface.
//!
//! The pipeline only sees this trait; the Meross cloud specifics live
//! in their own module. A different plug vendor would be a new file
//! implementing `PlugSource`.

use anyhow::Result;
use async_trait::async_trait;

pub mod meross;

/// One bulk-fetch row from the source vendor: a plug and its
/// instantaneous electrical readings.
#[derive(Debug, Clone, PartialEq)]
pub struct PlugReading {
    pub name: String,
    pub power_watt: f64,
    pub voltage: f64,
    pub current_amp: f64,
}

/// A cloud-connected smart-plug fleet.
#[async_trait]
pub trait PlugSource: Send + Sync {
    /// Names of all monitorable plugs currently known to the vendor.
    async fn discover_devices(&self) -> Result<Vec<String>>;

    /// Instantaneous readings for ALL plugs in one round-trip. The
    /// caller discards rows it is not interested in.
    async fn fetch_readings(&self) -> Result<Vec<PlugReading>>;
}
