//! Client for the NGINX Plus REST API.

use super::{get_body, Connections, SourceError, StatusSnapshot, StatusSource};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::error::Category;

#[derive(Debug, Deserialize)]
struct PlusConnections {
    accepted: u64,
    dropped: u64,
    active: u64,
    idle: u64,
}

#[derive(Debug, Deserialize)]
struct PlusRequests {
    total: u64,
    current: u64,
}

/// Fetches status from the NGINX Plus API.
///
/// The API does not break active connections down into reading and writing,
/// so in-flight requests are reported as writing and the remainder of the
/// active connections as reading.
pub struct PlusClient {
    http: reqwest::blocking::Client,
    base: String,
    version: u32,
}

impl PlusClient {
    /// Creates a client for a known API version without contacting NGINX.
    pub fn new(http: reqwest::blocking::Client, uri: &str, version: u32) -> Self {
        Self {
            http,
            base: uri.trim_end_matches('/').to_string(),
            version,
        }
    }

    /// Queries the API root for supported versions and picks the newest.
    pub fn connect(http: reqwest::blocking::Client, uri: &str) -> Result<Self, SourceError> {
        let base = uri.trim_end_matches('/');
        let versions: Vec<u32> = get_json(&http, &format!("{base}/"))?;
        let version = versions
            .into_iter()
            .max()
            .ok_or_else(|| SourceError::Parse("empty API version list".to_string()))?;

        tracing::debug!(uri = base, version, "Selected NGINX Plus API version");
        Ok(Self::new(http, base, version))
    }

    /// Selected API version.
    pub fn version(&self) -> u32 {
        self.version
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base, self.version, path)
    }
}

impl StatusSource for PlusClient {
    fn fetch(&self) -> Result<StatusSnapshot, SourceError> {
        let conns: PlusConnections = get_json(&self.http, &self.endpoint("connections"))?;
        let requests: PlusRequests = get_json(&self.http, &self.endpoint("http/requests"))?;
        Ok(to_snapshot(&conns, &requests))
    }
}

fn to_snapshot(conns: &PlusConnections, requests: &PlusRequests) -> StatusSnapshot {
    StatusSnapshot {
        connections: Connections {
            active: conns.active,
            accepted: conns.accepted,
            handled: conns.accepted.saturating_sub(conns.dropped),
            reading: conns.active.saturating_sub(requests.current),
            writing: requests.current,
            waiting: conns.idle,
        },
        requests: requests.total,
    }
}

fn get_json<T: DeserializeOwned>(
    http: &reqwest::blocking::Client,
    uri: &str,
) -> Result<T, SourceError> {
    let body = get_body(http, uri)?;
    decode_json(&body)
}

/// Deserializes an API document. The error keeps only the failure category
/// and position; serde_json's own message can quote body strings.
fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| {
        let what = match e.classify() {
            Category::Syntax => "malformed JSON",
            Category::Data => "unexpected JSON value",
            Category::Eof => "truncated JSON",
            Category::Io => "unreadable JSON",
        };
        SourceError::Parse(format!("{what} at line {}, column {}", e.line(), e.column()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{classify, ScrapeErrorType};

    #[test]
    fn test_snapshot_mapping() {
        let conns = PlusConnections {
            accepted: 100,
            dropped: 3,
            active: 10,
            idle: 4,
        };
        let requests = PlusRequests {
            total: 500,
            current: 6,
        };

        let snapshot = to_snapshot(&conns, &requests);
        assert_eq!(snapshot.connections.handled, 97);
        assert_eq!(snapshot.connections.writing, 6);
        assert_eq!(snapshot.connections.reading, 4);
        assert_eq!(snapshot.connections.waiting, 4);
        assert_eq!(snapshot.requests, 500);
    }

    #[test]
    fn test_reading_never_underflows() {
        let conns = PlusConnections {
            accepted: 1,
            dropped: 5,
            active: 1,
            idle: 0,
        };
        let requests = PlusRequests {
            total: 1,
            current: 3,
        };

        let snapshot = to_snapshot(&conns, &requests);
        assert_eq!(snapshot.connections.reading, 0);
        assert_eq!(snapshot.connections.handled, 0);
    }

    #[test]
    fn test_wrong_typed_field_is_parse_error() {
        let body = r#"{"accepted":"connection reset","dropped":0,"active":1,"idle":0}"#;
        let err = decode_json::<PlusConnections>(body).unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, SourceError::Parse(_)));
        assert!(!message.contains("connection"));
        assert!(message.contains("unexpected JSON value at line 1"));
        assert_eq!(classify(&message), ScrapeErrorType::Parse);
    }

    #[test]
    fn test_truncated_json_is_parse_error() {
        let err = decode_json::<PlusRequests>(r#"{"total":5,"#).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("failed to parse response body: truncated JSON at line 1"));
    }

    #[cfg(feature = "server")]
    mod live {
        use super::*;
        use crate::client::test_server::spawn;
        use crate::client::{build_http_client, HttpSettings};
        use axum::{routing::get, Router};

        fn plus_router() -> Router {
            Router::new()
                .route("/api/", get(|| async { "[1,2,3,8,9]" }))
                .route(
                    "/api/9/connections",
                    get(|| async { r#"{"accepted":100,"dropped":1,"active":5,"idle":4}"# }),
                )
                .route(
                    "/api/9/http/requests",
                    get(|| async { r#"{"total":500,"current":1}"# }),
                )
        }

        #[test]
        fn test_connect_selects_newest_version() {
            let (_rt, base) = spawn(plus_router());
            let http = build_http_client(&HttpSettings::default()).unwrap();

            let client = PlusClient::connect(http, &format!("{base}/api")).unwrap();
            assert_eq!(client.version(), 9);

            let snapshot = client.fetch().unwrap();
            assert_eq!(snapshot.connections.accepted, 100);
            assert_eq!(snapshot.connections.handled, 99);
            assert_eq!(snapshot.requests, 500);
        }

        #[test]
        fn test_malformed_json_is_parse_error() {
            let router = Router::new().route("/api/", get(|| async { "not json" }));
            let (_rt, base) = spawn(router);
            let http = build_http_client(&HttpSettings::default()).unwrap();

            let err = PlusClient::connect(http, &format!("{base}/api")).err().unwrap();
            assert!(matches!(err, SourceError::Parse(_)));
            assert_eq!(classify(&err.to_string()), ScrapeErrorType::Parse);
        }
    }
}
