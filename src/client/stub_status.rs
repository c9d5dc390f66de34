//! Client for the open-source NGINX `stub_status` page.
//!
//! The page is a fixed four-line text document:
//!
//! ```text
//! Active connections: 291
//! server accepts handled requests
//!  16630948 16630948 31070465
//! Reading: 6 Writing: 179 Waiting: 106
//! ```

use super::{get_body, Connections, SourceError, StatusSnapshot, StatusSource};

/// Fetches status from a `stub_status` location.
pub struct StubStatusClient {
    http: reqwest::blocking::Client,
    uri: String,
}

impl StubStatusClient {
    /// Creates a client without contacting NGINX.
    pub fn new(http: reqwest::blocking::Client, uri: impl Into<String>) -> Self {
        Self {
            http,
            uri: uri.into(),
        }
    }

    /// Creates a client and checks that the status page is reachable and
    /// parseable.
    pub fn connect(
        http: reqwest::blocking::Client,
        uri: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let client = Self::new(http, uri);
        client.fetch()?;
        Ok(client)
    }

    /// The scraped URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl StatusSource for StubStatusClient {
    fn fetch(&self) -> Result<StatusSnapshot, SourceError> {
        let body = get_body(&self.http, &self.uri)?;
        parse_stub_status(&body)
    }
}

/// Parses the body of a `stub_status` page.
///
/// Error details refer to line and field positions only and never echo the
/// body, so that they cannot be mistaken for transport failures.
pub fn parse_stub_status(body: &str) -> Result<StatusSnapshot, SourceError> {
    let lines: Vec<&str> = body.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() < 4 {
        return Err(SourceError::Parse(format!(
            "expected 4 lines, got {}",
            lines.len()
        )));
    }

    let active = lines[0]
        .strip_prefix("Active connections:")
        .ok_or_else(|| SourceError::Parse("line 1: unexpected prefix".to_string()))
        .and_then(|rest| parse_number(rest.trim(), 1, 1))?;

    let totals: Vec<&str> = lines[2].split_whitespace().collect();
    if totals.len() != 3 {
        return Err(SourceError::Parse(format!(
            "line 3: expected 3 fields, got {}",
            totals.len()
        )));
    }
    let accepted = parse_number(totals[0], 3, 1)?;
    let handled = parse_number(totals[1], 3, 2)?;
    let requests = parse_number(totals[2], 3, 3)?;

    let states: Vec<&str> = lines[3].split_whitespace().collect();
    if states.len() != 6 || states[0] != "Reading:" || states[2] != "Writing:" || states[4] != "Waiting:" {
        return Err(SourceError::Parse(
            "line 4: expected Reading/Writing/Waiting fields".to_string(),
        ));
    }
    let reading = parse_number(states[1], 4, 2)?;
    let writing = parse_number(states[3], 4, 4)?;
    let waiting = parse_number(states[5], 4, 6)?;

    Ok(StatusSnapshot {
        connections: Connections {
            active,
            accepted,
            handled,
            reading,
            writing,
            waiting,
        },
        requests,
    })
}

fn parse_number(field: &str, line: usize, position: usize) -> Result<u64, SourceError> {
    field.parse().map_err(|_| {
        SourceError::Parse(format!("line {line}, field {position}: invalid number"))
    })
}
