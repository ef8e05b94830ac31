//! HTTP fetch with timeout and exponential backoff retry
//!
//! **Algorithm:**
//! 1. GET the URL and parse the body as JSON
//! 2. Run the caller's parse/validate step on the JSON value
//! 3. On any failure, if attempts remain: log WARN, sleep
//!    `retry_delay * 2^(attempt-1)`, retry
//! 4. After the last attempt: return `RetriesExhausted` carrying the
//!    final failure message and the attempt count
//!
//! Only index and project fetches go through the retry path. Image probes,
//! year meta and health checks call the single-attempt helpers directly.

use crate::error::{LoaderError, LoaderResult};
use folio_common::LoaderSettings;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay before the attempt following `attempt` (1-based)
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor)
}

/// Single GET returning the body as untyped JSON
pub async fn fetch_json(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> LoaderResult<serde_json::Value> {
    let timeout_ms = timeout.as_millis() as u64;

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| LoaderError::from_reqwest(url, timeout_ms, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoaderError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| LoaderError::from_reqwest(url, timeout_ms, e))?;

    serde_json::from_slice(&body).map_err(|e| LoaderError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// GET + parse with up to `max_retries` attempts
pub async fn fetch_with_retry<T, F>(
    client: &Client,
    url: &str,
    settings: &LoaderSettings,
    parse: F,
) -> LoaderResult<T>
where
    F: Fn(serde_json::Value) -> LoaderResult<T>,
{
    let max_attempts = settings.max_retries.max(1);
    let timeout = Duration::from_millis(settings.request_timeout_ms);
    let base_delay = Duration::from_millis(settings.retry_delay_ms);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            debug!(url, attempt, "Retrying fetch");
        }

        match fetch_json(client, url, timeout).await.and_then(&parse) {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < max_attempts {
                    let delay = backoff_delay(base_delay, attempt);
                    warn!(
                        url,
                        attempt,
                        max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "Fetch failed, will retry after backoff"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    warn!(url, attempt, error = %err, "Fetch failed, no attempts left");
                }
                last_error = Some(err);
            }
        }
    }

    Err(LoaderError::RetriesExhausted {
        url: url.to_string(),
        attempts: max_attempts,
        last: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule_doubles() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_saturates() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 0), base);
        assert!(backoff_delay(base, 64) >= backoff_delay(base, 32));
    }

    #[tokio::test]
    async fn test_unreachable_host_exhausts_retries() {
        let client = Client::new();
        let settings = LoaderSettings {
            max_retries: 2,
            retry_delay_ms: 10,
            request_timeout_ms: 500,
            ..LoaderSettings::default()
        };

        // Port 9 (discard) on localhost is closed in test environments
        let result: LoaderResult<serde_json::Value> =
            fetch_with_retry(&client, "http://127.0.0.1:9/projects.json", &settings, Ok).await;

        match result {
            Err(LoaderError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }
}
