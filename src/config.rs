//! Exporter configuration.
//!
//! Values are resolved once at startup with the precedence
//! flag > environment variable > config file > built-in default, and the
//! resulting [`ExporterConfig`] is passed explicitly to whatever needs it.

use crate::client::HttpSettings;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Where the metrics server listens.
///
/// Written either as a TCP socket address (`0.0.0.0:9113`) or as
/// `unix:<path>` for a Unix domain socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ListenAddress {
    /// TCP socket address.
    Tcp(SocketAddr),
    /// Filesystem path of a Unix domain socket.
    Unix(PathBuf),
}

impl FromStr for ListenAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("unix:") {
            Some("") => Err(ConfigError::InvalidListenAddress(s.to_string())),
            Some(path) => Ok(Self::Unix(PathBuf::from(path))),
            None => s
                .parse()
                .map(Self::Tcp)
                .map_err(|_| ConfigError::InvalidListenAddress(s.to_string())),
        }
    }
}

impl TryFrom<String> for ListenAddress {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ListenAddress> for String {
    fn from(addr: ListenAddress) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "{addr}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

impl Default for ListenAddress {
    fn default() -> Self {
        Self::Tcp(([0, 0, 0, 0], 9113).into())
    }
}

/// Resolved exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Address the metrics server listens on.
    pub listen_address: ListenAddress,
    /// Path under which metrics are exposed.
    pub telemetry_path: String,
    /// Scrape the NGINX Plus API instead of `stub_status`.
    pub plus: bool,
    /// `stub_status` URI, or NGINX Plus API base URI.
    pub scrape_uri: String,
    /// Verify the upstream TLS certificate.
    pub ssl_verify: bool,
    /// Deadline for one scrape request.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Startup attempts to reach NGINX beyond the first.
    pub retries: u32,
    /// Pause between startup attempts.
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
    /// Labels attached to every exported NGINX metric.
    pub const_labels: BTreeMap<String, String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: ListenAddress::default(),
            telemetry_path: "/metrics".to_string(),
            plus: false,
            scrape_uri: "http://127.0.0.1:8080/stub_status".to_string(),
            ssl_verify: true,
            timeout: Duration::from_secs(5),
            retries: 0,
            retry_interval: Duration::from_secs(5),
            const_labels: BTreeMap::new(),
        }
    }
}

impl ExporterConfig {
    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scrape_uri.starts_with("http://") || self.scrape_uri.starts_with("https://")) {
            return Err(ConfigError::InvalidScrapeUri(self.scrape_uri.clone()));
        }
        // The router treats `{...}`, `:x` and `*x` segments as captures.
        let has_capture = self.telemetry_path.contains(['{', '}'])
            || self
                .telemetry_path
                .split('/')
                .any(|segment| segment.starts_with([':', '*']));
        if !self.telemetry_path.starts_with('/') || self.telemetry_path == "/" || has_capture {
            return Err(ConfigError::InvalidTelemetryPath(self.telemetry_path.clone()));
        }
        if let Some(name) = self.const_labels.keys().find(|k| k.is_empty()) {
            return Err(ConfigError::InvalidLabel(name.clone()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::NonPositiveDuration("timeout"));
        }
        if self.retry_interval.is_zero() {
            return Err(ConfigError::NonPositiveDuration("retry_interval"));
        }
        Ok(())
    }

    /// Metric namespace for the configured NGINX flavor.
    pub fn namespace(&self) -> &'static str {
        if self.plus {
            "nginxplus"
        } else {
            "nginx"
        }
    }

    /// HTTP client settings for scraping NGINX.
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: self.timeout,
            ssl_verify: self.ssl_verify,
            ..Default::default()
        }
    }

    /// Constant labels in the form the metrics layer expects.
    pub fn const_labels_map(&self) -> HashMap<String, String> {
        self.const_labels.clone().into_iter().collect()
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for [`ExporterConfig`].
    #[error("failed to parse config file: {0}")]
    ParseError(String),
    /// The scrape URI is not an http(s) URL.
    #[error("scrape URI must be an http or https URL: {0:?}")]
    InvalidScrapeUri(String),
    /// The telemetry path is empty, relative or the root.
    #[error("telemetry path must start with '/' and must not be '/': {0:?}")]
    InvalidTelemetryPath(String),
    /// A constant label is not of the form `name=value`.
    #[error("invalid constant label {0:?}, expected name=value")]
    InvalidLabel(String),
    /// The listen address is neither `host:port` nor `unix:<path>`.
    #[error("invalid listen address {0:?}, expected host:port or unix:<path>")]
    InvalidListenAddress(String),
    /// A duration setting is zero.
    #[error("{0} must be a positive duration")]
    NonPositiveDuration(&'static str),
}

/// Command-line interface. Every option may also be set through the
/// environment variable shown in `--help`.
#[derive(Parser, Debug, Default)]
#[command(name = "nginx-exporter", version, about = "Prometheus exporter for NGINX")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on for web interface and telemetry, or unix:<path>
    #[arg(long = "web.listen-address", env = "LISTEN_ADDRESS")]
    pub listen_address: Option<ListenAddress>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", env = "TELEMETRY_PATH")]
    pub telemetry_path: Option<String>,

    /// Scrape NGINX Plus instead of open-source NGINX
    #[arg(long = "nginx.plus", env = "NGINX_PLUS", num_args = 0..=1, default_missing_value = "true")]
    pub plus: Option<bool>,

    /// URI of the stub_status page, or of the NGINX Plus API
    #[arg(long = "nginx.scrape-uri", env = "SCRAPE_URI")]
    pub scrape_uri: Option<String>,

    /// Perform TLS certificate verification
    #[arg(long = "nginx.ssl-verify", env = "SSL_VERIFY", num_args = 0..=1, default_missing_value = "true")]
    pub ssl_verify: Option<bool>,

    /// Timeout for scraping NGINX, e.g. "5s"
    #[arg(long = "nginx.timeout", env = "TIMEOUT", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Startup retries when NGINX cannot be reached
    #[arg(long = "nginx.retries", env = "NGINX_RETRIES")]
    pub retries: Option<u32>,

    /// Interval between startup retries, e.g. "5s"
    #[arg(long = "nginx.retry-interval", env = "NGINX_RETRY_INTERVAL", value_parser = humantime::parse_duration)]
    pub retry_interval: Option<Duration>,

    /// Constant label added to every metric, as name=value (repeatable)
    #[arg(
        long = "prometheus.const-label",
        env = "CONST_LABELS",
        value_delimiter = ',',
        value_parser = parse_label
    )]
    pub const_labels: Vec<(String, String)>,

    /// Default log level when RUST_LOG is not set
    #[arg(long = "log.level", env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Resolves the final configuration: file (if any), then CLI/env overrides.
    pub fn resolve(self) -> Result<ExporterConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::from_file(path)?,
            None => ExporterConfig::default(),
        };

        if let Some(addr) = self.listen_address {
            config.listen_address = addr;
        }
        if let Some(path) = self.telemetry_path {
            config.telemetry_path = path;
        }
        if let Some(plus) = self.plus {
            config.plus = plus;
        }
        if let Some(uri) = self.scrape_uri {
            config.scrape_uri = uri;
        }
        if let Some(verify) = self.ssl_verify {
            config.ssl_verify = verify;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(interval) = self.retry_interval {
            config.retry_interval = interval;
        }
        config.const_labels.extend(self.const_labels);

        config.validate()?;
        Ok(config)
    }
}

fn parse_label(s: &str) -> Result<(String, String), ConfigError> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ConfigError::InvalidLabel(s.to_string())),
    }
}
