//! Upstream status sources.
//!
//! A status source knows how to reach one NGINX flavor and turn its native
//! status representation into a [`StatusSnapshot`]. The collector only sees
//! the [`StatusSource`] trait; the concrete flavor is chosen once at startup.

mod plus;
mod stub_status;

pub use plus::PlusClient;
pub use stub_status::{parse_stub_status, StubStatusClient};

use std::time::Duration;
use thiserror::Error;

/// Point-in-time connection counters reported by NGINX.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Connections {
    /// Currently open client connections, including idle ones.
    pub active: u64,
    /// Client connections accepted since startup.
    pub accepted: u64,
    /// Client connections handled since startup.
    pub handled: u64,
    /// Connections where NGINX is reading the request header.
    pub reading: u64,
    /// Connections where NGINX is writing the response.
    pub writing: u64,
    /// Idle keep-alive connections.
    pub waiting: u64,
}

/// One status snapshot fetched from the monitored server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Connection counters.
    pub connections: Connections,
    /// Client requests served since startup.
    pub requests: u64,
}

/// Errors returned by a status source.
///
/// The rendered messages are part of the contract: the collector classifies
/// failures by their text, so transport failures always start with
/// `failed to get` and unexpected status codes always read
/// `expected 200 response`.
#[derive(Debug, Error)]
pub enum SourceError {
    /// NGINX could not be reached.
    #[error("failed to get {uri}: {source}")]
    Transport {
        /// Requested URI.
        uri: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// NGINX answered with a status other than 200.
    #[error("expected 200 response, got {status}")]
    Status {
        /// Requested URI.
        uri: String,
        /// Returned status code.
        status: u16,
    },

    /// The response body could not be read.
    #[error("failed to read response body from {uri}: {source}")]
    Body {
        /// Requested URI.
        uri: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body is not a valid status document.
    #[error("failed to parse response body: {0}")]
    Parse(String),

    /// The HTTP client could not be built.
    #[error("failed to create http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Capability to fetch one status snapshot from the monitored server.
///
/// Implementations are not required to be re-entrant; the collector
/// serializes calls.
pub trait StatusSource: Send {
    /// Fetches and parses the current status.
    fn fetch(&self) -> Result<StatusSnapshot, SourceError>;
}

/// Settings for the HTTP client shared by both flavors.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Deadline for a whole request, connect through body.
    pub timeout: Duration,
    /// Verify the upstream TLS certificate.
    pub ssl_verify: bool,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            ssl_verify: true,
            user_agent: format!("nginx-exporter/{}", crate::VERSION),
        }
    }
}

/// Builds the blocking HTTP client used to scrape NGINX.
pub fn build_http_client(settings: &HttpSettings) -> Result<reqwest::blocking::Client, SourceError> {
    reqwest::blocking::Client::builder()
        .timeout(settings.timeout)
        .danger_accept_invalid_certs(!settings.ssl_verify)
        .user_agent(settings.user_agent.clone())
        .build()
        .map_err(SourceError::Client)
}

/// Issues a GET and returns the body of a 200 response.
fn get_body(http: &reqwest::blocking::Client, uri: &str) -> Result<String, SourceError> {
    let response = http.get(uri).send().map_err(|source| SourceError::Transport {
        uri: uri.to_string(),
        source,
    })?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(SourceError::Status {
            uri: uri.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().map_err(|source| SourceError::Body {
        uri: uri.to_string(),
        source,
    })
}
