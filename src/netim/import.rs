//! Ingestion envelope for the NetIM network-metric-import service.

use serde_json::{json, Value};

use crate::pipeline::Reading;

/// Build one single-point-in-time sample submission. The capture
/// timestamp doubles as both envelope bounds, and the metric values
/// must go over the wire as strings; the import service rejects
/// native JSON numbers.
pub fn import_body(reading: &Reading, metric_id: &str, timestamp_ms: i64) -> Value {
    json!({
        "source": "external",
        "metricClass": metric_id,
        "identifiers": {
            "VNES_OE": {
                "deviceID": reading.platform_id,
            }
        },
        "maxTimestamp": timestamp_ms,
        "minTimestamp": timestamp_ms,
        "sampleList": [
            {
                "sampleInfo": null,
                "fieldValues": {
                    "MetricPowerW": reading.power_watt.to_string(),
                    "MetricVoltage": reading.voltage.to_string(),
                    "MetricCurrent": reading.current_amp.to_string(),
                    "timestamp": timestamp_ms.to_string(),
                }
            }
        ]
    })
}
