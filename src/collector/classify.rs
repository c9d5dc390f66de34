//! Scrape failure classification.

use std::fmt;

const NETWORK_PATTERNS: [&str; 4] = ["failed to get", "connection", "timeout", "refused"];
const HTTP_PATTERNS: [&str; 1] = ["expected 200 response"];

/// Category of a failed scrape, exported as the `type` label of
/// `scrape_errors_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeErrorType {
    /// NGINX could not be reached.
    Network,
    /// NGINX answered with an unexpected status code.
    Http,
    /// NGINX answered but the payload could not be interpreted.
    Parse,
}

impl ScrapeErrorType {
    /// All categories, in label order.
    pub const ALL: [ScrapeErrorType; 3] = [Self::Network, Self::Http, Self::Parse];

    /// Label value for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Http => "http",
            Self::Parse => "parse",
        }
    }

    /// Whether NGINX should still be reported as up after this failure.
    ///
    /// Only unreachability counts as down; a server that answered badly is up.
    pub fn server_up(&self) -> bool {
        !matches!(self, Self::Network)
    }
}

impl fmt::Display for ScrapeErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a rendered error message to its category.
///
/// Network patterns are checked first, then HTTP status patterns; anything
/// else is a parse failure.
pub fn classify(message: &str) -> ScrapeErrorType {
    if NETWORK_PATTERNS.iter().any(|p| message.contains(p)) {
        ScrapeErrorType::Network
    } else if HTTP_PATTERNS.iter().any(|p| message.contains(p)) {
        ScrapeErrorType::Http
    } else {
        ScrapeErrorType::Parse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_network_messages() {
        for msg in [
            "failed to get http://localhost:8080/stub_status: connection refused",
            "failed to get http://localhost:8080/stub_status: timeout",
            "connection reset by peer",
            "dial tcp 127.0.0.1:8080: refused",
        ] {
            assert_eq!(classify(msg), ScrapeErrorType::Network, "{msg}");
        }
    }

    #[test]
    fn test_http_messages() {
        assert_eq!(classify("expected 200 response, got 404"), ScrapeErrorType::Http);
        assert_eq!(classify("expected 200 response, got 500"), ScrapeErrorType::Http);
    }

    #[test]
    fn test_parse_messages() {
        assert_eq!(
            classify("failed to parse response body"),
            ScrapeErrorType::Parse
        );
        assert_eq!(classify(""), ScrapeErrorType::Parse);
    }

    #[test]
    fn test_network_wins_over_http() {
        assert_eq!(
            classify("expected 200 response, got 502: upstream timeout"),
            ScrapeErrorType::Network
        );
    }

    #[test]
    fn test_up_policy() {
        assert!(!ScrapeErrorType::Network.server_up());
        assert!(ScrapeErrorType::Http.server_up());
        assert!(ScrapeErrorType::Parse.server_up());
    }

    proptest! {
        #[test]
        fn prop_network_keyword_always_network(
            prefix in "[a-z :/0-9]{0,20}",
            suffix in "[a-z :/0-9]{0,20}",
            idx in 0usize..NETWORK_PATTERNS.len(),
        ) {
            let msg = format!("{prefix}{}{suffix}", NETWORK_PATTERNS[idx]);
            prop_assert_eq!(classify(&msg), ScrapeErrorType::Network);
        }

        #[test]
        fn prop_keyword_free_is_parse(msg in "[A-Z0-9 .,]{0,40}") {
            prop_assert_eq!(classify(&msg), ScrapeErrorType::Parse);
        }
    }
}
