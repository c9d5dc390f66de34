//! Startup construction of the NGINX status source.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

/// Calls `make` until it succeeds, at most `retries + 1` times.
///
/// Sleeps `interval` between attempts, never after the last one, and returns
/// the last error if every attempt fails. Only used at startup; scrapes are
/// never retried.
pub fn create_with_retries<T, E, F>(mut make: F, retries: u32, interval: Duration) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match make() {
            Ok(client) => return Ok(client),
            Err(e) if attempt < retries => {
                attempt += 1;
                tracing::warn!(
                    attempt,
                    retries,
                    error = %e,
                    "Could not create NGINX client. Retrying in {:?}...",
                    interval
                );
                thread::sleep(interval);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(result: Result<&'static str, &'static str>, retries: u32) -> (Result<&'static str, &'static str>, u32) {
        let mut invocations = 0;
        let got = create_with_retries(
            || {
                invocations += 1;
                result
            },
            retries,
            Duration::from_millis(1),
        );
        (got, invocations)
    }

    #[test]
    fn test_valid_client_no_retries() {
        let (got, invocations) = run(Ok("client"), 3);
        assert_eq!(got, Ok("client"));
        assert_eq!(invocations, 1);
    }

    #[test]
    fn test_error_without_retries() {
        let (got, invocations) = run(Err("error"), 0);
        assert_eq!(got, Err("error"));
        assert_eq!(invocations, 1);
    }

    #[test]
    fn test_error_after_retries() {
        let (got, invocations) = run(Err("error"), 3);
        assert_eq!(got, Err("error"));
        assert_eq!(invocations - 1, 3);
    }

    #[test]
    fn test_success_after_failures() {
        let mut invocations = 0;
        let got: Result<u32, String> = create_with_retries(
            || {
                invocations += 1;
                if invocations < 3 {
                    Err(format!("attempt {invocations}"))
                } else {
                    Ok(invocations)
                }
            },
            5,
            Duration::from_millis(1),
        );
        assert_eq!(got, Ok(3));
    }
}
