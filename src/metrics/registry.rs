//! Exporter registry and text exposition.

use crate::collector::StatusCollector;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Builds the `nginxexporter_build_info` gauge, always 1.
pub fn build_info_gauge() -> Result<Gauge, MetricsError> {
    let gauge = Gauge::with_opts(
        Opts::new("nginxexporter_build_info", "Exporter build information")
            .const_label("version", crate::VERSION),
    )?;
    gauge.set(1.0);
    Ok(gauge)
}

/// Prometheus registry holding the exporter's collectors.
///
/// Cloning is cheap and shares the underlying registry.
#[derive(Clone)]
pub struct ExporterRegistry {
    registry: Registry,
}

impl ExporterRegistry {
    /// Creates a registry with build info and the given NGINX collector.
    pub fn new(collector: StatusCollector) -> Result<Self, MetricsError> {
        let registry = Registry::new();
        registry.register(Box::new(build_info_gauge()?))?;
        registry.register(Box::new(collector))?;
        Ok(Self { registry })
    }

    /// Runs every collector once. Scrapes NGINX, so this blocks.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Gathers and encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
