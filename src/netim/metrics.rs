//! Metric-class resolution — maps the configured display name to a
//! NetIM metric-class id and checks the class declares the sub-metrics
//! this bridge uploads.

use serde::Deserialize;
use thiserror::Error;

/// Sub-metric names the user custom metric class must declare.
/// Presence is checked, types and units are not.
const REQUIRED_FIELDS: [&str; 3] = ["Power", "Voltage", "Current"];

#[derive(Debug, Deserialize)]
pub struct MetricClassList {
    #[serde(default)]
    pub items: Vec<MetricClass>,
}

#[derive(Debug, Deserialize)]
pub struct MetricClass {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metrics: MetricItems,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricItems {
    #[serde(default)]
    pub items: Vec<MetricField>,
}

#[derive(Debug, Deserialize)]
pub struct MetricField {
    pub name: String,
}

/// Why the metric class could not be resolved. Each variant ends the
/// current pipeline run; none of them is fatal to the process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetricLookupError {
    #[error("no metric class named {0:?} exists on the server")]
    NotFound(String),
    #[error("metric class {name:?} is missing sub-metrics: {missing}")]
    InvalidDefinition { name: String, missing: String },
    #[error("metric-classes lookup failed: {0}")]
    Transport(String),
}

/// Select the first class whose display name matches exactly, then
/// validate its shape.
pub fn select_metric_class<'a>(
    classes: &'a [MetricClass],
    expected_name: &str,
) -> Result<&'a MetricClass, MetricLookupError> {
    let class = classes
        .iter()
        .find(|c| c.name == expected_name)
        .ok_or_else(|| MetricLookupError::NotFound(expected_name.to_string()))?;

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !class.metrics.items.iter().any(|m| m.name == *field))
        .collect();

    if !missing.is_empty() {
        return Err(MetricLookupError::InvalidDefinition {
            name: class.name.clone(),
            missing: missing.join(", "),
        });
    }

    Ok(class)
}
