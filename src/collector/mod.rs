//! NGINX metrics collection.
//!
//! [`StatusCollector`] implements the `prometheus` crate's `Collector`
//! trait: `desc()` advertises a fixed set of descriptors built once at
//! construction, and every `collect()` scrapes the status source, times the
//! scrape and reports either the status metrics or a classified failure.
//!
//! # Metrics Exposed
//!
//! All names are prefixed with the configured namespace.
//!
//! ## Status Metrics
//! - `connections_active` - Active client connections (gauge)
//! - `connections_accepted` - Accepted client connections (counter)
//! - `connections_handled` - Handled client connections (counter)
//! - `connections_reading` - Connections reading the request header (gauge)
//! - `connections_writing` - Connections writing the response (gauge)
//! - `connections_waiting` - Idle client connections (gauge)
//! - `http_requests_total` - Total http requests (counter)
//!
//! ## Scrape Metrics
//! - `up` - 1 unless the last scrape could not reach NGINX
//! - `scrape_success` - 1 if the last scrape succeeded
//! - `scrape_duration_seconds` - Duration of the last scrape
//! - `scrape_errors_total{type}` - Failed scrapes by `network`, `http` or `parse`

mod classify;
mod descriptors;
mod status;

pub use classify::{classify, ScrapeErrorType};
pub use descriptors::{build_descriptors, const_sample, MetaMetrics, ValueType};
pub use status::{ScrapeOutcome, StatusCollector};

use thiserror::Error;

/// Errors that can occur while constructing a collector.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// A descriptor or meta-metric was rejected by the prometheus crate.
    #[error("invalid metric definition: {0}")]
    Prometheus(#[from] prometheus::Error),
}
