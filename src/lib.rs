//! NGINX Prometheus Exporter Library
//!
//! Exposes the connection and request counters of a running NGINX (or
//! NGINX Plus) instance to Prometheus, scraping the server on every
//! collection.
//!
//! # Architecture
//!
//! ```text
//! HTTP scrape → ExporterRegistry::gather → StatusCollector::collect
//!                                               ↓
//!                                  StatusSource::fetch (stub_status | Plus API)
//!                                               ↓
//!                         status samples | classified failure + meta-metrics
//! ```
//!
//! # Design Principles
//!
//! - **One scrape at a time**: collections are serialized per collector
//! - **Never fail a scrape**: upstream failures become metrics, not errors
//! - **Explicit configuration**: no process-wide mutable state
//!
//! # Example
//!
//! ```no_run
//! use nginx_exporter::{
//!     client::{build_http_client, HttpSettings, StubStatusClient},
//!     collector::StatusCollector,
//!     metrics::ExporterRegistry,
//! };
//! use std::collections::HashMap;
//!
//! let http = build_http_client(&HttpSettings::default()).unwrap();
//! let source = StubStatusClient::connect(http, "http://127.0.0.1:8080/stub_status").unwrap();
//!
//! let labels = HashMap::from([("job".to_string(), "nginx".to_string())]);
//! let collector = StatusCollector::new(Box::new(source), "nginx", &labels).unwrap();
//! let registry = ExporterRegistry::new(collector).unwrap();
//!
//! print!("{}", registry.encode().unwrap());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod bootstrap;
pub mod client;
pub mod collector;
pub mod config;
pub mod metrics;

// Re-export commonly used types at crate root
pub use client::{PlusClient, StatusSnapshot, StatusSource, StubStatusClient};
pub use collector::{ScrapeErrorType, StatusCollector};
pub use config::{Cli, ExporterConfig};
pub use metrics::ExporterRegistry;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
