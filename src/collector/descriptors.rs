//! Metric descriptors for NGINX status and scrape meta-metrics.

use super::ScrapeErrorType;
use crate::client::StatusSnapshot;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::{Gauge, IntCounterVec, Opts};
use std::collections::{BTreeMap, HashMap};

/// Exposition type of a status sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Monotonically increasing since NGINX started.
    Counter,
    /// Point-in-time value.
    Gauge,
}

impl ValueType {
    fn metric_type(self) -> MetricType {
        match self {
            Self::Counter => MetricType::COUNTER,
            Self::Gauge => MetricType::GAUGE,
        }
    }
}

/// One status field exported as a metric.
pub(crate) struct StatusMetric {
    pub key: &'static str,
    pub help: &'static str,
    pub value_type: ValueType,
    pub value: fn(&StatusSnapshot) -> u64,
}

pub(crate) const STATUS_METRICS: [StatusMetric; 7] = [
    StatusMetric {
        key: "connections_active",
        help: "Active client connections",
        value_type: ValueType::Gauge,
        value: |s| s.connections.active,
    },
    StatusMetric {
        key: "connections_accepted",
        help: "Accepted client connections",
        value_type: ValueType::Counter,
        value: |s| s.connections.accepted,
    },
    StatusMetric {
        key: "connections_handled",
        help: "Handled client connections",
        value_type: ValueType::Counter,
        value: |s| s.connections.handled,
    },
    StatusMetric {
        key: "connections_reading",
        help: "Connections where NGINX is reading the request header",
        value_type: ValueType::Gauge,
        value: |s| s.connections.reading,
    },
    StatusMetric {
        key: "connections_writing",
        help: "Connections where NGINX is writing the response back to the client",
        value_type: ValueType::Gauge,
        value: |s| s.connections.writing,
    },
    StatusMetric {
        key: "connections_waiting",
        help: "Idle client connections",
        value_type: ValueType::Gauge,
        value: |s| s.connections.waiting,
    },
    StatusMetric {
        key: "http_requests_total",
        help: "Total http requests",
        value_type: ValueType::Counter,
        value: |s| s.requests,
    },
];

/// Builds the status descriptors, keyed by metric key.
///
/// Fails only if `namespace` or a label name is not a valid metric
/// identifier.
pub fn build_descriptors(
    namespace: &str,
    const_labels: &HashMap<String, String>,
) -> prometheus::Result<BTreeMap<&'static str, Desc>> {
    STATUS_METRICS
        .iter()
        .map(|m| {
            let desc = Desc::new(
                format!("{namespace}_{}", m.key),
                m.help.to_string(),
                Vec::new(),
                const_labels.clone(),
            )?;
            Ok((m.key, desc))
        })
        .collect()
}

/// Builds a single transient sample for `desc`.
pub fn const_sample(desc: &Desc, value: f64, value_type: ValueType) -> MetricFamily {
    let mut metric = proto::Metric::default();
    metric.set_label(desc.const_label_pairs.clone().into());
    match value_type {
        ValueType::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(value);
            metric.set_counter(counter);
        }
        ValueType::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(value);
            metric.set_gauge(gauge);
        }
    }

    let mut family = MetricFamily::default();
    family.set_name(desc.fq_name.clone());
    family.set_help(desc.help.clone());
    family.set_field_type(value_type.metric_type());
    family.set_metric(vec![metric].into());
    family
}

/// Metrics describing the scrape itself. Their last values persist between
/// scrapes.
pub struct MetaMetrics {
    /// `up`: 0 only when NGINX could not be reached.
    pub up: Gauge,
    /// `scrape_success`: 1 or 0.
    pub scrape_success: Gauge,
    /// `scrape_duration_seconds`.
    pub scrape_duration: Gauge,
    /// `scrape_errors_total`, labelled by `type`.
    pub scrape_errors: IntCounterVec,
}

impl MetaMetrics {
    /// Creates the meta-metrics under `namespace`.
    pub fn new(
        namespace: &str,
        const_labels: &HashMap<String, String>,
    ) -> prometheus::Result<Self> {
        let opts = |name: &str, help: &str| {
            Opts::new(name, help)
                .namespace(namespace)
                .const_labels(const_labels.clone())
        };

        let up = Gauge::with_opts(opts("up", "Status of the last metric scrape"))?;
        let scrape_success = Gauge::with_opts(opts(
            "scrape_success",
            "Whether the last scrape of NGINX metrics was successful",
        ))?;
        let scrape_duration = Gauge::with_opts(opts(
            "scrape_duration_seconds",
            "Duration of the last scrape in seconds",
        ))?;
        let scrape_errors = IntCounterVec::new(
            opts("scrape_errors_total", "Total number of scrape errors by type"),
            &["type"],
        )?;

        // Expose every error type from the first scrape on.
        for kind in ScrapeErrorType::ALL {
            scrape_errors.with_label_values(&[kind.as_str()]);
        }

        Ok(Self {
            up,
            scrape_success,
            scrape_duration,
            scrape_errors,
        })
    }

    /// Descriptors of all four meta-metrics.
    pub fn descs(&self) -> Vec<&Desc> {
        let mut descs = self.up.desc();
        descs.extend(self.scrape_success.desc());
        descs.extend(self.scrape_duration.desc());
        descs.extend(self.scrape_errors.desc());
        descs
    }
}
