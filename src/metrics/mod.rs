//! Prometheus exposition for the NGINX exporter.
//!
//! [`ExporterRegistry`] owns the Prometheus registry with the build-info
//! gauge and the NGINX [`StatusCollector`](crate::collector::StatusCollector).
//! With the `server` feature, [`MetricsServer`] serves it over HTTP.
//!
//! # Example
//!
//! ```no_run
//! use nginx_exporter::client::{build_http_client, HttpSettings, StubStatusClient};
//! use nginx_exporter::collector::StatusCollector;
//! use nginx_exporter::metrics::ExporterRegistry;
//! use std::collections::HashMap;
//!
//! let http = build_http_client(&HttpSettings::default()).expect("http client");
//! let source = StubStatusClient::new(http, "http://127.0.0.1:8080/stub_status");
//! let collector = StatusCollector::new(Box::new(source), "nginx", &HashMap::new())
//!     .expect("valid namespace");
//!
//! let registry = ExporterRegistry::new(collector).expect("Failed to create registry");
//! println!("{}", registry.encode().expect("encode"));
//! ```

mod registry;
#[cfg(feature = "server")]
mod server;

pub use registry::{build_info_gauge, ExporterRegistry, MetricsError};
#[cfg(feature = "server")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
