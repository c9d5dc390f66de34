//! Prometheus collector that scrapes NGINX on every collection.

use super::descriptors::{build_descriptors, const_sample, MetaMetrics, STATUS_METRICS};
use super::{classify, CollectorError, ScrapeErrorType};
use crate::client::{StatusSnapshot, StatusSource};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

const NGINX_UP: f64 = 1.0;
const NGINX_DOWN: f64 = 0.0;

/// Result of one fetch from the status source.
#[derive(Debug)]
pub enum ScrapeOutcome {
    /// NGINX returned a usable snapshot.
    Success(StatusSnapshot),
    /// The fetch failed.
    Failure {
        /// Classified category.
        kind: ScrapeErrorType,
        /// Rendered error message.
        message: String,
    },
}

/// Collects NGINX status metrics.
///
/// Each call to [`Collector::collect`] performs one scrape of the status
/// source while holding the collector lock, so concurrent collections run
/// one after another.
pub struct StatusCollector {
    source: Mutex<Box<dyn StatusSource>>,
    status_descs: BTreeMap<&'static str, Desc>,
    meta: MetaMetrics,
}

impl StatusCollector {
    /// Creates a collector exporting metrics under `namespace`, with
    /// `const_labels` attached to every metric.
    pub fn new(
        source: Box<dyn StatusSource>,
        namespace: &str,
        const_labels: &HashMap<String, String>,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            source: Mutex::new(source),
            status_descs: build_descriptors(namespace, const_labels)?,
            meta: MetaMetrics::new(namespace, const_labels)?,
        })
    }

    fn scrape(source: &dyn StatusSource) -> ScrapeOutcome {
        match source.fetch() {
            Ok(snapshot) => ScrapeOutcome::Success(snapshot),
            Err(e) => {
                let message = e.to_string();
                ScrapeOutcome::Failure {
                    kind: classify(&message),
                    message,
                }
            }
        }
    }

    fn handle_scrape_error(
        &self,
        out: &mut Vec<MetricFamily>,
        kind: ScrapeErrorType,
        message: &str,
    ) {
        self.meta
            .up
            .set(if kind.server_up() { NGINX_UP } else { NGINX_DOWN });
        self.meta
            .scrape_errors
            .with_label_values(&[kind.as_str()])
            .inc();
        self.meta.scrape_success.set(0.0);

        out.extend(self.meta.up.collect());
        out.extend(self.meta.scrape_success.collect());
        out.extend(self.meta.scrape_errors.collect());

        tracing::error!(error = message, r#type = kind.as_str(), "error getting stats");
    }

    fn handle_scrape_success(&self, out: &mut Vec<MetricFamily>, snapshot: &StatusSnapshot) {
        self.meta.up.set(NGINX_UP);
        self.meta.scrape_success.set(1.0);

        out.extend(self.meta.up.collect());
        out.extend(self.meta.scrape_success.collect());
        out.extend(self.meta.scrape_errors.collect());

        for metric in &STATUS_METRICS {
            if let Some(desc) = self.status_descs.get(metric.key) {
                let value = (metric.value)(snapshot) as f64;
                out.push(const_sample(desc, value, metric.value_type));
            }
        }
    }
}

impl Collector for StatusCollector {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.meta.descs();
        descs.extend(self.status_descs.values());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        // Held for the whole cycle, fetch included.
        let source = self.source.lock().unwrap_or_else(PoisonError::into_inner);

        let start = Instant::now();
        let outcome = Self::scrape(&**source);
        self.meta
            .scrape_duration
            .set(start.elapsed().as_secs_f64());

        let mut out = self.meta.scrape_duration.collect();
        match outcome {
            ScrapeOutcome::Success(snapshot) => self.handle_scrape_success(&mut out, &snapshot),
            ScrapeOutcome::Failure { kind, message } => {
                self.handle_scrape_error(&mut out, kind, &message)
            }
        }
        out
    }
}
